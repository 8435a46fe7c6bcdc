use crate::extractor::ExtractorRegistry;
use crate::model::{ExtractionFailure, InventoryRecord, PluginStatus, ScanResult, ScanStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: &'a ScanStatus,
    inventories: Vec<Entry<'a>>,
    failures: &'a [ExtractionFailure],
    plugins: &'a [PluginStatus],
}

/// An inventory record plus the identifiers its extractor derives from it.
#[derive(Serialize)]
struct Entry<'a> {
    #[serde(flatten)]
    record: &'a InventoryRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    purl: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cpes: Vec<String>,
}

pub fn render_json(result: &ScanResult, registry: &ExtractorRegistry) -> Result<String> {
    let inventories = result
        .sorted_inventories()
        .into_iter()
        .map(|record| Entry {
            record,
            purl: registry.to_purl(record).ok().map(|p| p.to_string()),
            cpes: registry.to_cpes(record).unwrap_or_default(),
        })
        .collect();

    let report = Report {
        start_time: result.start_time,
        end_time: result.end_time,
        status: &result.status,
        inventories,
        failures: &result.failures,
        plugins: &result.plugins,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn print_json(result: &ScanResult, registry: &ExtractorRegistry) -> Result<()> {
    println!("{}", render_json(result, registry)?);
    Ok(())
}
