mod cli;
mod json;

pub use cli::{print_cli_table, render_table};
pub use json::{print_json, render_json};

use crate::extractor::ExtractorRegistry;
use crate::model::ScanResult;
use anyhow::Result;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
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

pub fn print_result(
    result: &ScanResult,
    registry: &ExtractorRegistry,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(result, registry),
        OutputFormat::Json => print_json(result, registry),
    }
}

/// Format result to string for file output
pub fn format_result_to_string(
    result: &ScanResult,
    registry: &ExtractorRegistry,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(result, registry),
        // Tables are for terminals; files get JSON.
        OutputFormat::Table => render_json(result, registry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("sarif".parse::<OutputFormat>().is_err());
    }
}
