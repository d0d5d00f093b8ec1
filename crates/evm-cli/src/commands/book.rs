use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use evm_core::reconcile::{self, TemplateInput};
use evm_core::types::ProgressId;
use evm_core::{Book, EngineConfig};

use super::read_document;

/// Arguments for book validation
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to JSON input file: a book, or { book, config? }
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BookDocument {
    Wrapped {
        book: Book,
        #[serde(default)]
        config: Option<EngineConfig>,
    },
    Bare(Book),
}

pub fn run_validate(args: ValidateArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: BookDocument = read_document(args.input.as_deref(), "validate")?;
    let report = match doc {
        BookDocument::Wrapped { book, config: inline } => {
            reconcile::validate_book(&book, &EngineConfig::resolve(config, inline.as_ref()))
        }
        BookDocument::Bare(book) => reconcile::validate_book(&book, &EngineConfig::resolve(config, None)),
    };
    Ok(serde_json::to_value(report)?)
}

/// Arguments for the standard axis template
#[derive(Args)]
pub struct TemplateArgs {
    /// Path to JSON input file: { book, progress, config? }
    #[arg(long)]
    pub input: Option<String>,

    /// Progress to fill (overrides the document)
    #[arg(long)]
    pub progress: Option<u64>,
}

pub fn run_template(args: TemplateArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut doc: TemplateInput = read_document(args.input.as_deref(), "template")?;
    if let Some(id) = args.progress {
        doc.progress = ProgressId(id);
    }
    let result = reconcile::apply_template(&doc, config)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the axis category lookup
#[derive(Args)]
pub struct CategoriesArgs {
    /// Path to JSON input file: a book, or { book, config? }
    #[arg(long)]
    pub input: Option<String>,

    /// Case-insensitive match on code or name
    #[arg(long)]
    pub search: Option<String>,
}

pub fn run_categories(args: CategoriesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: BookDocument = read_document(args.input.as_deref(), "categories")?;
    let book = match doc {
        BookDocument::Wrapped { book, .. } => book,
        BookDocument::Bare(book) => book,
    };
    let result = reconcile::list_axis_categories(&book, args.search.as_deref());
    Ok(serde_json::to_value(result)?)
}
