//! Extraction orchestrator.
//!
//! A [`Scanner`] walks a directory tree, offers every regular file to every
//! registered [`FileExtractor`], runs every [`StandaloneExtractor`] once, and
//! aggregates what they return into a [`ScanResult`].
//!
//! # Example
//!
//! ```no_run
//! use invscan::extractor::{ExtractorConfig, ExtractorRegistry};
//! use invscan::scanner::{ScanConfig, Scanner};
//! use std::path::Path;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(ExtractorRegistry::builtin(&ExtractorConfig::default()));
//!     let scanner = Scanner::new(registry, ScanConfig::default());
//!
//!     let result = scanner.scan(Path::new("."), &CancellationToken::new()).await?;
//!     for record in result.sorted_inventories() {
//!         println!("{} ({})", record.inventory, record.extractor);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Extractor failures never abort a scan; they end up in
//! [`ScanResult::failures`]. Only an unreadable root and cancellation are
//! fatal, and both still return what was aggregated so far.

use crate::config::glob_match;
use crate::error::{ExtractError, ScanError};
use crate::extractor::{
    ExtractorRegistry, FileExtractor, FileInfo, ScanInput, StandaloneExtractor,
    StandaloneInput,
};
use crate::model::{
    Descriptor, ExtractionFailure, FailureKind, Inventory, InventoryRecord, PluginStatus,
    ScanResult, ScanStatus,
};
use crate::stats::{NoopCollector, StatsCollector};
use chrono::Utc;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const WALK_CHANNEL_CAPACITY: usize = 256;

/// Orchestrator settings.
#[derive(Clone)]
pub struct ScanConfig {
    /// Upper bound on extractions running at once.
    pub max_concurrency: usize,
    /// Directory names (or `*` patterns) that are not descended into.
    pub skip_dirs: Vec<String>,
    pub stats: Arc<dyn StatsCollector>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            skip_dirs: vec![".git".to_string(), "node_modules".to_string()],
            stats: Arc::new(NoopCollector),
        }
    }
}

pub struct Scanner {
    registry: Arc<ExtractorRegistry>,
    config: ScanConfig,
}

/// A regular file found by the walk.
struct Candidate {
    abs: PathBuf,
    path: String,
    info: FileInfo,
}

struct TaskOutcome {
    elapsed: Duration,
    result: Result<Vec<Inventory>, ExtractError>,
}

struct Pending {
    extractor: Descriptor,
    path: Option<String>,
}

enum Stop {
    Done,
    Cancelled,
    WalkFailed(io::Error),
}

impl Scanner {
    pub fn new(registry: Arc<ExtractorRegistry>, config: ScanConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Scans `root` until every extraction has finished or `cancel` fires.
    pub async fn scan(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        let started = Instant::now();
        let mut agg = Aggregator::new(self.config.stats.as_ref());
        info!(root = %root.display(), extractors = self.registry.len(), "starting scan");

        if let Err(source) = tokio::fs::metadata(root).await {
            return Err(self.fail_walk(agg, root, source, started));
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

        let (tx, mut rx) = mpsc::channel(WALK_CHANNEL_CAPACITY);
        let walker = {
            let root = root.to_path_buf();
            let skip_dirs = self.config.skip_dirs.clone();
            let cancel = cancel.clone();
            task::spawn_blocking(move || walk(&root, &skip_dirs, &tx, &cancel))
        };

        let mut stop = Stop::Done;
        'dispatch: {
            for extractor in self.registry.standalone_extractors() {
                let Some(permit) = acquire(&semaphore, cancel).await else {
                    stop = Stop::Cancelled;
                    break 'dispatch;
                };
                let id = spawn_standalone(&mut tasks, Arc::clone(extractor), cancel.clone(), permit);
                agg.pending.insert(
                    id,
                    Pending {
                        extractor: extractor.descriptor(),
                        path: None,
                    },
                );
            }

            let mut walking = true;
            while walking || !tasks.is_empty() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        stop = Stop::Cancelled;
                        break 'dispatch;
                    }
                    Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                        agg.record(joined);
                    }
                    candidate = rx.recv(), if walking => {
                        let Some(candidate) = candidate else {
                            walking = false;
                            continue;
                        };
                        let candidate = Arc::new(candidate);
                        for extractor in self.registry.file_extractors() {
                            if !extractor.file_required(&candidate.path, &candidate.info) {
                                continue;
                            }
                            let Some(permit) = acquire(&semaphore, cancel).await else {
                                stop = Stop::Cancelled;
                                break 'dispatch;
                            };
                            let id = spawn_file(
                                &mut tasks,
                                Arc::clone(extractor),
                                Arc::clone(&candidate),
                                root.to_path_buf(),
                                cancel.clone(),
                                permit,
                            );
                            agg.pending.insert(
                                id,
                                Pending {
                                    extractor: extractor.descriptor(),
                                    path: Some(candidate.path.clone()),
                                },
                            );
                        }
                    }
                }
            }

            match walker.await {
                Ok(Ok(())) => {}
                Ok(Err(source)) => stop = Stop::WalkFailed(source),
                Err(e) => return Err(ScanError::Runtime(e.to_string())),
            }
        }
        drop(rx);

        match stop {
            Stop::Done => {
                let result = self.finish(agg, ScanStatus::Succeeded, started);
                info!(
                    inventories = result.inventories.len(),
                    failures = result.failures.len(),
                    "scan finished"
                );
                Ok(result)
            }
            Stop::Cancelled => {
                // In-flight extractions observe the token and finish promptly.
                while let Some(joined) = tasks.join_next_with_id().await {
                    agg.record(joined);
                }
                let partial = self.finish(agg, ScanStatus::Cancelled, started);
                warn!(inventories = partial.inventories.len(), "scan cancelled");
                Err(ScanError::Cancelled {
                    partial: Box::new(partial),
                })
            }
            Stop::WalkFailed(source) => {
                tasks.shutdown().await;
                Err(self.fail_walk(agg, root, source, started))
            }
        }
    }

    fn fail_walk(
        &self,
        agg: Aggregator<'_>,
        root: &Path,
        source: io::Error,
        started: Instant,
    ) -> ScanError {
        warn!(root = %root.display(), error = %source, "cannot walk scan root");
        let status = ScanStatus::Failed(format!("cannot walk {}: {}", root.display(), source));
        let partial = self.finish(agg, status, started);
        ScanError::Walk {
            root: root.display().to_string(),
            source,
            partial: Box::new(partial),
        }
    }

    fn finish(&self, agg: Aggregator<'_>, status: ScanStatus, started: Instant) -> ScanResult {
        let mut result = agg.result;

        let file = self.registry.file_extractors().iter().map(|e| e.descriptor());
        let standalone = self
            .registry
            .standalone_extractors()
            .iter()
            .map(|e| e.descriptor());
        result.plugins = file
            .chain(standalone)
            .map(|d| {
                let (runs, failures) = agg.counts.get(&d.name).copied().unwrap_or_default();
                PluginStatus::from_counts(d, runs, failures)
            })
            .collect();

        result.end_time = Utc::now();
        result.status = status;
        self.config.stats.after_scan(started.elapsed(), &result.status);
        result
    }
}

/// Single writer for the result of one scan.
struct Aggregator<'a> {
    result: ScanResult,
    counts: HashMap<String, (usize, usize)>,
    pending: HashMap<task::Id, Pending>,
    stats: &'a dyn StatsCollector,
}

impl<'a> Aggregator<'a> {
    fn new(stats: &'a dyn StatsCollector) -> Self {
        Self {
            result: ScanResult::new(),
            counts: HashMap::new(),
            pending: HashMap::new(),
            stats,
        }
    }

    fn record(&mut self, joined: Result<(task::Id, TaskOutcome), JoinError>) {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => (
                e.id(),
                TaskOutcome {
                    elapsed: Duration::ZERO,
                    result: Err(join_failure(e)),
                },
            ),
        };
        let Some(Pending { extractor, path }) = self.pending.remove(&id) else {
            return;
        };

        let success = outcome.result.is_ok();
        self.stats
            .after_extractor_run(&extractor.name, outcome.elapsed, success);
        let counts = self.counts.entry(extractor.name.clone()).or_default();
        counts.0 += 1;

        match outcome.result {
            Ok(inventories) => {
                debug!(
                    extractor = %extractor,
                    path = path.as_deref().unwrap_or("-"),
                    count = inventories.len(),
                    "extraction succeeded"
                );
                self.result.inventories.extend(
                    inventories
                        .into_iter()
                        .map(|inv| InventoryRecord::new(extractor.clone(), inv)),
                );
            }
            Err(e) => {
                counts.1 += 1;
                let kind = if e.is_cancelled() {
                    FailureKind::Cancelled
                } else if e.is_unsupported_platform() {
                    FailureKind::UnsupportedPlatform
                } else {
                    FailureKind::Error
                };
                if kind == FailureKind::Error {
                    warn!(
                        extractor = %extractor,
                        path = path.as_deref().unwrap_or("-"),
                        error = %e,
                        "extraction failed"
                    );
                } else {
                    debug!(extractor = %extractor, error = %e, "extraction skipped");
                }
                self.result.failures.push(ExtractionFailure {
                    extractor,
                    path,
                    kind,
                    message: e.to_string(),
                });
            }
        }
    }
}

fn join_failure(e: JoinError) -> ExtractError {
    if e.is_cancelled() {
        ExtractError::Cancelled
    } else {
        ExtractError::Task(e.to_string())
    }
}

async fn acquire(
    semaphore: &Arc<Semaphore>,
    cancel: &CancellationToken,
) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
    }
}

fn spawn_standalone(
    tasks: &mut JoinSet<TaskOutcome>,
    extractor: Arc<dyn StandaloneExtractor>,
    cancel: CancellationToken,
    permit: OwnedSemaphorePermit,
) -> task::Id {
    tasks
        .spawn(async move {
            let _permit = permit;
            let started = Instant::now();
            let input = StandaloneInput::new(cancel.clone());
            let result = tokio::select! {
                biased;
                result = extractor.extract(&input) => result,
                _ = cancel.cancelled() => Err(ExtractError::Cancelled),
            };
            TaskOutcome {
                elapsed: started.elapsed(),
                result,
            }
        })
        .id()
}

fn spawn_file(
    tasks: &mut JoinSet<TaskOutcome>,
    extractor: Arc<dyn FileExtractor>,
    candidate: Arc<Candidate>,
    root: PathBuf,
    cancel: CancellationToken,
    permit: OwnedSemaphorePermit,
) -> task::Id {
    tasks
        .spawn(async move {
            let _permit = permit;
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                result = extract_file(extractor.as_ref(), &candidate, root, cancel.clone()) => result,
                _ = cancel.cancelled() => Err(ExtractError::Cancelled),
            };
            TaskOutcome {
                elapsed: started.elapsed(),
                result,
            }
        })
        .id()
}

/// Opens a fresh handle for this extractor alone; it is closed when the
/// input is dropped.
async fn extract_file(
    extractor: &dyn FileExtractor,
    candidate: &Candidate,
    root: PathBuf,
    cancel: CancellationToken,
) -> Result<Vec<Inventory>, ExtractError> {
    let file = tokio::fs::File::open(&candidate.abs)
        .await
        .map_err(|source| ExtractError::Io {
            path: candidate.path.clone(),
            source,
        })?;
    let input = ScanInput::new(candidate.path.clone(), candidate.info.clone(), Box::new(file))
        .with_root(root)
        .with_cancel(cancel);
    extractor.extract(input).await
}

/// Feeds every regular file under `root` into `tx`.
///
/// Only a failure on the root itself is returned; anything deeper is logged
/// and skipped.
fn walk(
    root: &Path,
    skip_dirs: &[String],
    tx: &mpsc::Sender<Candidate>,
    cancel: &CancellationToken,
) -> Result<(), io::Error> {
    let entries = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && is_skipped(e.file_name(), skip_dirs)));

    for entry in entries {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(io::Error::from(e)),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping file without metadata");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        let candidate = Candidate {
            path: relative_path(root, entry.path()),
            info: FileInfo::from_metadata(name, &metadata),
            abs: entry.into_path(),
        };
        if tx.blocking_send(candidate).is_err() {
            // Receiver gone: the scan has stopped.
            return Ok(());
        }
    }

    Ok(())
}

fn is_skipped(name: &std::ffi::OsStr, skip_dirs: &[String]) -> bool {
    let name = name.to_string_lossy();
    skip_dirs.iter().any(|pattern| glob_match(pattern, &name))
}

/// `path` relative to `root`, `/`-separated. A root that is itself a file
/// maps to its own name.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    parts.join("/")
}
