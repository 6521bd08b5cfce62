mod cli;
mod json;

pub use cli::print_cli_table;
pub use json::{generate_json_string, print_json, JsonReport, ScanInfo, Summary};

use crate::model::ScanResult;
use anyhow::Result;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON report for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_result(results: &[ScanResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(results),
        OutputFormat::Json => print_json(results),
    }
}

/// Format results to string for file output
pub fn format_result_to_string(results: &[ScanResult], format: OutputFormat) -> Result<String> {
    match format {
        // Reports written to disk are always the structured form.
        OutputFormat::Json | OutputFormat::Table => generate_json_string(results),
    }
}
