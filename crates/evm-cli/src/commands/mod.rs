pub mod book;
pub mod explain;
pub mod import;
pub mod reconcile;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::input;

/// Read a command document from `--input` or piped stdin.
pub(crate) fn read_document<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err(format!("--input <file.json> or stdin required for {command}").into())
    }
}

/// Keep only `keys` of the envelope's result object.
pub(crate) fn narrow(mut envelope: Value, keys: &[&str]) -> Value {
    if let Some(Value::Object(result)) = envelope.get_mut("result") {
        result.retain(|k, _| keys.contains(&k.as_str()));
    }
    envelope
}
