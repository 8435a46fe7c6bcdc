//! Scan telemetry hooks.
//!
//! A [`StatsCollector`] is a passive observation point: extractors and the
//! scanner report what happened, the collector decides what to do with it.
//! Every hook has a no-op default, so instrumentation is strictly additive.

use crate::model::ScanStatus;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Outcome of a requirement check for a path whose name matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRequiredResult {
    Ok,
    SizeLimitExceeded,
}

/// Outcome of one extraction on one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileExtractedResult {
    Success,
    ErrorUnknown,
    ErrorCancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequiredStats {
    pub path: String,
    pub result: FileRequiredResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExtractedStats {
    pub path: String,
    pub result: FileExtractedResult,
}

/// Sink for structured scan telemetry.
pub trait StatsCollector: Send + Sync {
    /// Called once for every path an extractor's name pattern matched.
    fn after_file_required(&self, _extractor: &str, _stats: &FileRequiredStats) {}

    /// Called once for every file an extractor parsed.
    fn after_file_extracted(&self, _extractor: &str, _stats: &FileExtractedStats) {}

    /// Called by the scanner when one extraction task (file or standalone)
    /// finishes.
    fn after_extractor_run(&self, _extractor: &str, _elapsed: Duration, _success: bool) {}

    /// Called once at the end of a scan, whatever its outcome.
    fn after_scan(&self, _elapsed: Duration, _status: &ScanStatus) {}
}

/// Collector that discards everything. The default everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCollector;

impl StatsCollector for NoopCollector {}

/// Collector that forwards every event to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCollector;

impl StatsCollector for LoggingCollector {
    fn after_file_required(&self, extractor: &str, stats: &FileRequiredStats) {
        debug!(extractor, path = %stats.path, result = ?stats.result, "file required");
    }

    fn after_file_extracted(&self, extractor: &str, stats: &FileExtractedStats) {
        debug!(extractor, path = %stats.path, result = ?stats.result, "file extracted");
    }

    fn after_extractor_run(&self, extractor: &str, elapsed: Duration, success: bool) {
        debug!(
            extractor,
            elapsed_ms = elapsed.as_millis() as u64,
            success,
            "extractor run finished"
        );
    }

    fn after_scan(&self, elapsed: Duration, status: &ScanStatus) {
        debug!(elapsed_ms = elapsed.as_millis() as u64, status = %status, "scan finished");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records the last result per path, plus every extractor run.
    #[derive(Default)]
    pub(crate) struct RecordingCollector {
        pub required: Mutex<HashMap<String, FileRequiredResult>>,
        pub extracted: Mutex<HashMap<String, FileExtractedResult>>,
        pub runs: Mutex<Vec<(String, bool)>>,
        pub scans: Mutex<Vec<ScanStatus>>,
    }

    impl RecordingCollector {
        pub(crate) fn required(&self, path: &str) -> Option<FileRequiredResult> {
            self.required.lock().unwrap().get(path).copied()
        }

        pub(crate) fn extracted(&self, path: &str) -> Option<FileExtractedResult> {
            self.extracted.lock().unwrap().get(path).copied()
        }
    }

    impl StatsCollector for RecordingCollector {
        fn after_file_required(&self, _extractor: &str, stats: &FileRequiredStats) {
            self.required
                .lock()
                .unwrap()
                .insert(stats.path.clone(), stats.result);
        }

        fn after_file_extracted(&self, _extractor: &str, stats: &FileExtractedStats) {
            self.extracted
                .lock()
                .unwrap()
                .insert(stats.path.clone(), stats.result);
        }

        fn after_extractor_run(&self, extractor: &str, _elapsed: Duration, success: bool) {
            self.runs
                .lock()
                .unwrap()
                .push((extractor.to_string(), success));
        }

        fn after_scan(&self, _elapsed: Duration, status: &ScanStatus) {
            self.scans.lock().unwrap().push(status.clone());
        }
    }
}
