//! Text-to-Rows Parser
//!
//! Turns the loosely structured text a language model returns into two-column
//! rows. Strategies are tried in order:
//! - JSON array or object
//! - Markdown table
//! - Headed sections with `Label: value` lines
//! - A single raw-output row
//!
//! Parsing never fails and never returns an empty row list.

mod json;
mod markdown;
mod sections;

use crate::models::Row;
use tracing::debug;

/// Label used for the single row emitted when no structure is recognised
pub const RAW_OUTPUT_LABEL: &str = "Raw Output";

/// Which strategy produced the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Json,
    MarkdownTable,
    Sections,
    Fallback,
}

impl std::fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseStrategy::Json => write!(f, "json"),
            ParseStrategy::MarkdownTable => write!(f, "markdown_table"),
            ParseStrategy::Sections => write!(f, "sections"),
            ParseStrategy::Fallback => write!(f, "fallback"),
        }
    }
}

/// Parse model output into rows.
pub fn parse_rows(text: &str) -> Vec<Row> {
    parse_rows_with_strategy(text).1
}

/// Parse model output into rows, reporting which strategy matched.
pub fn parse_rows_with_strategy(text: &str) -> (ParseStrategy, Vec<Row>) {
    let (strategy, rows) = if text.trim().is_empty() {
        (ParseStrategy::Fallback, vec![fallback_row(text)])
    } else if let Some(rows) = json::parse_json_rows(text).filter(|rows| !rows.is_empty()) {
        (ParseStrategy::Json, rows)
    } else if let Some(rows) = markdown::parse_table_rows(text) {
        (ParseStrategy::MarkdownTable, rows)
    } else if let Some(rows) = sections::parse_section_rows(text) {
        (ParseStrategy::Sections, rows)
    } else {
        (ParseStrategy::Fallback, vec![fallback_row(text)])
    };

    debug!(strategy = %strategy, rows = rows.len(), "Parsed model output");
    (strategy, rows)
}

fn fallback_row(text: &str) -> Row {
    Row::new(RAW_OUTPUT_LABEL, text)
}
