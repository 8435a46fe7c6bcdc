use super::{Descriptor, InventoryRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Final state of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ScanStatus {
    Succeeded,
    Cancelled,
    Failed(String),
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::Succeeded => write!(f, "succeeded"),
            ScanStatus::Cancelled => write!(f, "cancelled"),
            ScanStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Error,
    Cancelled,
    UnsupportedPlatform,
}

/// A problem one extractor had with one input.
///
/// `path` is `None` for standalone extractors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionFailure {
    pub extractor: Descriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Succeeded,
    PartiallySucceeded,
    Failed,
}

/// Per-extractor summary of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    pub extractor: Descriptor,
    pub state: PluginState,
    pub runs: usize,
    pub failures: usize,
}

impl PluginStatus {
    pub fn from_counts(extractor: Descriptor, runs: usize, failures: usize) -> Self {
        let state = if failures == 0 {
            PluginState::Succeeded
        } else if failures < runs {
            PluginState::PartiallySucceeded
        } else {
            PluginState::Failed
        };
        Self {
            extractor,
            state,
            runs,
            failures,
        }
    }
}

/// Everything produced by one scan.
///
/// Inventories are not deduplicated: the same package found by two
/// extractors, or in two files, appears twice.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ScanStatus,
    pub inventories: Vec<InventoryRecord>,
    pub failures: Vec<ExtractionFailure>,
    pub plugins: Vec<PluginStatus>,
}

impl ScanResult {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            status: ScanStatus::Succeeded,
            inventories: Vec::new(),
            failures: Vec::new(),
            plugins: Vec::new(),
        }
    }

    /// Inventories sorted by name, then version, then extractor.
    pub fn sorted_inventories(&self) -> Vec<&InventoryRecord> {
        let mut sorted: Vec<&InventoryRecord> = self.inventories.iter().collect();
        sorted.sort_by(|a, b| {
            a.inventory
                .name
                .cmp(&b.inventory.name)
                .then_with(|| a.inventory.version.cmp(&b.inventory.version))
                .then_with(|| a.extractor.name.cmp(&b.extractor.name))
        });
        sorted
    }

    pub fn inventories_from<'a>(
        &'a self,
        extractor: &'a str,
    ) -> impl Iterator<Item = &'a InventoryRecord> + 'a {
        self.inventories
            .iter()
            .filter(move |r| r.extractor.name == extractor)
    }

    pub fn failures_from<'a>(
        &'a self,
        extractor: &'a str,
    ) -> impl Iterator<Item = &'a ExtractionFailure> + 'a {
        self.failures
            .iter()
            .filter(move |f| f.extractor.name == extractor)
    }

    pub fn plugin(&self, extractor: &str) -> Option<&PluginStatus> {
        self.plugins.iter().find(|p| p.extractor.name == extractor)
    }
}

impl Default for ScanResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Inventory;

    #[test]
    fn test_plugin_status_from_counts() {
        let d = Descriptor::new("x", 0);
        assert_eq!(
            PluginStatus::from_counts(d.clone(), 0, 0).state,
            PluginState::Succeeded
        );
        assert_eq!(
            PluginStatus::from_counts(d.clone(), 3, 1).state,
            PluginState::PartiallySucceeded
        );
        assert_eq!(
            PluginStatus::from_counts(d, 2, 2).state,
            PluginState::Failed
        );
    }

    #[test]
    fn test_sorted_inventories() {
        let d = Descriptor::new("dotnet/packageslockjson", 0);
        let mut result = ScanResult::new();
        for name in ["b", "a", "c"] {
            result
                .inventories
                .push(InventoryRecord::new(d.clone(), Inventory::new(name, "1.0")));
        }
        let names: Vec<&str> = result
            .sorted_inventories()
            .iter()
            .map(|r| r.inventory.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_scan_status_display() {
        assert_eq!(ScanStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(
            ScanStatus::Failed("root unreadable".to_string()).to_string(),
            "failed: root unreadable"
        );
    }
}
