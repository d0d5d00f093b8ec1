use napi::Result as NapiResult;
use napi_derive::napi;
use serde_json::Value;

use evm_core::reconcile::{ExplainInput, ReconcileInput};
use evm_core::{Book, EngineConfig};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn replay(input_json: &str) -> NapiResult<Value> {
    let input: ReconcileInput = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = evm_core::reconcile::reconcile(&input, None).map_err(to_napi_error)?;
    serde_json::to_value(output).map_err(to_napi_error)
}

/// Keep only `keys` of the envelope's result object.
fn select(mut envelope: Value, keys: &[&str]) -> NapiResult<String> {
    if let Some(Value::Object(result)) = envelope.get_mut("result") {
        result.retain(|k, _| keys.contains(&k.as_str()));
    }
    serde_json::to_string(&envelope).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[napi]
pub fn reconcile(input_json: String) -> NapiResult<String> {
    let output = replay(&input_json)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn monthly_kpis(input_json: String) -> NapiResult<String> {
    select(replay(&input_json)?, &["monthly_kpis", "project_kpis"])
}

#[napi]
pub fn project_metrics(input_json: String) -> NapiResult<String> {
    select(replay(&input_json)?, &["metrics", "states"])
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[napi]
pub fn explain_record(input_json: String) -> NapiResult<String> {
    let input: ExplainInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = evm_core::reconcile::explain_records(&input, None).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn validate_book(book_json: String, config_json: Option<String>) -> NapiResult<String> {
    let book: Book = serde_json::from_str(&book_json).map_err(to_napi_error)?;
    let config: EngineConfig = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => EngineConfig::default(),
    };
    let output = evm_core::reconcile::validate_book(&book, &config);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn axis_categories(book_json: String, search: Option<String>) -> NapiResult<String> {
    let book: Book = serde_json::from_str(&book_json).map_err(to_napi_error)?;
    let output = evm_core::reconcile::list_axis_categories(&book, search.as_deref());
    serde_json::to_string(&output).map_err(to_napi_error)
}
