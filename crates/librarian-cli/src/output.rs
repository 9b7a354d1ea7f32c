//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use librarian_core::events::ProvisionCompletion;
use librarian_entity::conversion::{ConversionRequest, ConversionResult, ConversionSubject};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Conversion result display row
#[derive(Debug, Serialize, Tabled)]
pub struct ResultRow {
    /// Folder or document
    kind: &'static str,
    /// Subject id
    id: String,
    /// Status
    status: String,
    /// Messages
    messages: String,
}

impl From<&ConversionResult> for ResultRow {
    fn from(result: &ConversionResult) -> Self {
        let kind = match result.subject {
            ConversionSubject::Folder(_) => "folder",
            ConversionSubject::Document(_) => "document",
        };
        Self {
            kind,
            id: result.subject.id().to_string(),
            status: result.status.to_string(),
            messages: result
                .messages
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// Conversion request display row
#[derive(Debug, Serialize, Tabled)]
pub struct RequestRow {
    /// Request id
    id: String,
    /// Folder id
    folder_id: String,
    /// Folder developer name
    folder: String,
    /// Sharing principals
    principals: String,
    /// Library id, once provisioned
    library_id: String,
    /// Group id, once provisioned
    group_id: String,
    /// Created at
    created_at: String,
}

impl From<&ConversionRequest> for RequestRow {
    fn from(request: &ConversionRequest) -> Self {
        let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        Self {
            id: request.id.to_string(),
            folder_id: request.folder_id.to_string(),
            folder: request.folder_developer_name.clone(),
            principals: request.sharing_principals.clone(),
            library_id: or_dash(request.library_id.map(|id| id.to_string())),
            group_id: or_dash(request.group_id.map(|id| id.to_string())),
            created_at: request.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Provisioning completion display row
#[derive(Debug, Serialize, Tabled)]
pub struct CompletionRow {
    /// Request id
    request_id: String,
    /// Library id
    library_id: String,
    /// Group id
    group_id: String,
}

impl From<&ProvisionCompletion> for CompletionRow {
    fn from(completion: &ProvisionCompletion) -> Self {
        Self {
            request_id: completion.request_id.to_string(),
            library_id: completion.library_id.to_string(),
            group_id: completion.group_id.to_string(),
        }
    }
}

/// Convert a slice into display rows
pub fn rows<'a, S: 'a, R: From<&'a S>>(items: &'a [S]) -> Vec<R> {
    items.iter().map(R::from).collect()
}
