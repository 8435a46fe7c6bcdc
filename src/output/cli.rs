use crate::extractor::ExtractorRegistry;
use crate::model::{FailureKind, PluginState, ScanResult, ScanStatus};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct InventoryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Extractor")]
    extractor: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "PURL")]
    purl: String,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Extractor")]
    extractor: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Error")]
    message: String,
}

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "Extractor")]
    extractor: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Runs")]
    runs: usize,
    #[tabled(rename = "Failures")]
    failures: usize,
}

pub fn print_cli_table(result: &ScanResult, registry: &ExtractorRegistry) -> Result<()> {
    print!("{}", render_table(result, registry)?);
    Ok(())
}

/// Renders the human-readable report: inventories, failures, per-extractor
/// status and a summary.
pub fn render_table(
    result: &ScanResult,
    registry: &ExtractorRegistry,
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write_report(&mut out, result, registry)?;
    Ok(out)
}

fn write_report(
    out: &mut String,
    result: &ScanResult,
    registry: &ExtractorRegistry,
) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(
        out,
        "Scan finished at: {}",
        result.end_time.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out)?;

    if result.inventories.is_empty() {
        writeln!(out, "No packages found.")?;
    } else {
        writeln!(out, "Found {} packages:", result.inventories.len())?;
        writeln!(out)?;

        let rows: Vec<InventoryRow> = result
            .sorted_inventories()
            .into_iter()
            .map(|r| InventoryRow {
                name: truncate(&r.inventory.name, 40),
                version: r.inventory.version.clone(),
                extractor: r.extractor.name.clone(),
                location: truncate(&r.inventory.locations.join(", "), 50),
                purl: registry
                    .to_purl(r)
                    .map(|p| truncate(&p.to_string(), 60))
                    .unwrap_or_else(|_| "-".to_string()),
            })
            .collect();

        writeln!(out, "{}", Table::new(rows).with(Style::rounded()))?;
    }

    if !result.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "{} extractions did not succeed:", result.failures.len())?;
        writeln!(out)?;

        let rows: Vec<FailureRow> = result
            .failures
            .iter()
            .map(|f| FailureRow {
                kind: format_failure_kind(f.kind),
                extractor: f.extractor.name.clone(),
                path: f.path.clone().unwrap_or_else(|| "-".to_string()),
                message: truncate(&f.message, 60),
            })
            .collect();

        writeln!(out, "{}", Table::new(rows).with(Style::rounded()))?;
    }

    if !result.plugins.is_empty() {
        writeln!(out)?;
        let rows: Vec<PluginRow> = result
            .plugins
            .iter()
            .map(|p| PluginRow {
                extractor: p.extractor.to_string(),
                state: format_plugin_state(p.state),
                runs: p.runs,
                failures: p.failures,
            })
            .collect();
        writeln!(out, "{}", Table::new(rows).with(Style::rounded()))?;
    }

    writeln!(out)?;
    write_summary(out, result)
}

fn write_summary(out: &mut String, result: &ScanResult) -> std::fmt::Result {
    let mut by_extractor: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &result.inventories {
        *by_extractor.entry(record.extractor.name.as_str()).or_default() += 1;
    }

    writeln!(out, "Summary:")?;
    writeln!(out, "  Total packages: {}", result.inventories.len())?;
    if by_extractor.len() > 1 {
        let breakdown: Vec<String> = by_extractor
            .iter()
            .map(|(name, count)| format!("{} {}", count, name))
            .collect();
        writeln!(out, "  By extractor: {}", breakdown.join(", "))?;
    }

    let errors = result
        .failures
        .iter()
        .filter(|f| f.kind == FailureKind::Error)
        .count();
    if errors > 0 {
        writeln!(out, "  Errors: {}", errors)?;
    }

    let elapsed = result.end_time - result.start_time;
    writeln!(out, "  Duration: {} ms", elapsed.num_milliseconds())?;
    writeln!(out, "  Status: {}", format_status(&result.status))
}

fn format_failure_kind(kind: FailureKind) -> String {
    match kind {
        FailureKind::Error => "\x1b[31mERROR\x1b[0m".to_string(),
        FailureKind::Cancelled => "\x1b[33mCANCELLED\x1b[0m".to_string(),
        FailureKind::UnsupportedPlatform => "UNSUPPORTED".to_string(),
    }
}

fn format_plugin_state(state: PluginState) -> String {
    match state {
        PluginState::Succeeded => "\x1b[32mok\x1b[0m".to_string(),
        PluginState::PartiallySucceeded => "\x1b[33mpartial\x1b[0m".to_string(),
        PluginState::Failed => "\x1b[31mfailed\x1b[0m".to_string(),
    }
}

fn format_status(status: &ScanStatus) -> String {
    match status {
        ScanStatus::Succeeded => status.to_string(),
        _ => format!("\x1b[33m{}\x1b[0m", status),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::filesystem::dotnet::packageslockjson;
    use crate::extractor::ExtractorConfig;
    use crate::model::{Descriptor, ExtractionFailure, Inventory, InventoryRecord};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Some.Longer.Name.Dep", 10), "Some.Lo...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_render_empty_result() {
        let out = render_table(&ScanResult::new(), &ExtractorRegistry::new()).unwrap();
        assert!(out.contains("No packages found."));
        assert!(out.contains("Total packages: 0"));
        assert!(out.contains("Status: succeeded"));
    }

    #[test]
    fn test_render_inventories_and_failures() {
        let registry = ExtractorRegistry::builtin(&ExtractorConfig::default());
        let descriptor = Descriptor::new(packageslockjson::NAME, 0);
        let mut result = ScanResult::new();
        result.inventories.push(InventoryRecord::new(
            descriptor.clone(),
            Inventory::new("Core.Dep", "1.24.0").with_location("app/packages.lock.json"),
        ));
        result.failures.push(ExtractionFailure {
            extractor: descriptor,
            path: Some("bad/packages.lock.json".to_string()),
            kind: FailureKind::Error,
            message: "parse error".to_string(),
        });

        let out = render_table(&result, &registry).unwrap();
        assert!(out.contains("Found 1 packages"));
        assert!(out.contains("pkg:nuget/Core.Dep@1.24.0"));
        assert!(out.contains("bad/packages.lock.json"));
        assert!(out.contains("Errors: 1"));
    }
}
