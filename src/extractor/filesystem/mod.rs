//! File-based extractors and the requirement policy they share.

pub mod dotnet;

use super::Extractor;
use crate::error::ExtractError;
use crate::model::Inventory;
use crate::stats::{
    FileExtractedResult, FileExtractedStats, FileRequiredResult, FileRequiredStats,
    StatsCollector,
};
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

const READ_CHUNK_BYTES: usize = 64 * 1024;
const MAX_PREALLOC_BYTES: usize = 16 * 1024 * 1024;

/// File metadata available to [`FileExtractor::file_required`].
///
/// Decoupled from `std::fs::Metadata` so requirement checks can be tested
/// without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mode: u32,
    pub is_dir: bool,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mode: 0o644,
            is_dir: false,
        }
    }

    pub fn from_metadata(name: impl Into<String>, metadata: &Metadata) -> Self {
        Self {
            name: name.into(),
            size: metadata.len(),
            mode: mode_bits(metadata),
            is_dir: metadata.is_dir(),
        }
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// One file presented to an extractor.
///
/// `path` is relative to `root` and uses `/` separators; it is what ends up
/// in [`Inventory::locations`].
pub struct ScanInput {
    pub path: String,
    pub root: PathBuf,
    pub info: FileInfo,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub cancel: CancellationToken,
}

impl ScanInput {
    pub fn new(
        path: impl Into<String>,
        info: FileInfo,
        reader: Box<dyn AsyncRead + Send + Unpin>,
    ) -> Self {
        Self {
            path: path.into(),
            root: PathBuf::new(),
            info,
            reader,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reads the whole stream, giving up as soon as the scan is cancelled.
    pub async fn read_all(&mut self) -> Result<Vec<u8>, ExtractError> {
        let Self {
            path,
            info,
            reader,
            cancel,
            ..
        } = self;

        let capacity = usize::try_from(info.size)
            .unwrap_or(0)
            .min(MAX_PREALLOC_BYTES);
        let mut content = Vec::with_capacity(capacity);
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];

        loop {
            if cancel.is_cancelled() {
                return Err(ExtractError::Cancelled);
            }

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                read = reader.read(&mut chunk) => read,
            };
            let n = read.map_err(|source| ExtractError::Io {
                path: path.clone(),
                source,
            })?;

            if n == 0 {
                return Ok(content);
            }
            content.extend_from_slice(&chunk[..n]);
        }
    }
}

/// An extractor that parses individual files found during a walk.
#[async_trait]
pub trait FileExtractor: Extractor {
    /// Decides from path and metadata alone whether this file should be
    /// extracted. Must not read the file.
    fn file_required(&self, path: &str, info: &FileInfo) -> bool;

    /// Parses the presented file. Every returned inventory has `input.path`
    /// as its location.
    async fn extract(&self, input: ScanInput) -> Result<Vec<Inventory>, ExtractError>;
}

/// How a file name is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    Exact(&'static str),
    Suffix(&'static str),
}

impl NamePattern {
    fn matches(&self, file_name: &str) -> bool {
        match self {
            NamePattern::Exact(name) => file_name == *name,
            NamePattern::Suffix(suffix) => {
                file_name.len() > suffix.len() && file_name.ends_with(suffix)
            }
        }
    }
}

/// Name pattern plus size limit.
///
/// A `max_file_size_bytes` of 0 means unlimited; a file exactly at the limit
/// is accepted. Only paths whose name matched are reported to the stats
/// collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRequirement {
    pub pattern: NamePattern,
    pub max_file_size_bytes: u64,
}

impl FileRequirement {
    pub fn new(pattern: NamePattern, max_file_size_bytes: u64) -> Self {
        Self {
            pattern,
            max_file_size_bytes,
        }
    }

    pub fn check(
        &self,
        extractor: &str,
        path: &str,
        info: &FileInfo,
        stats: &dyn StatsCollector,
    ) -> bool {
        let Some(file_name) = Path::new(path).file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.pattern.matches(file_name) {
            return false;
        }

        let result = if self.max_file_size_bytes > 0 && info.size > self.max_file_size_bytes {
            FileRequiredResult::SizeLimitExceeded
        } else {
            FileRequiredResult::Ok
        };

        stats.after_file_required(
            extractor,
            &FileRequiredStats {
                path: path.to_string(),
                result,
            },
        );

        result == FileRequiredResult::Ok
    }
}

/// Reports the outcome of one extraction to the stats collector.
pub fn report_extracted(
    stats: &dyn StatsCollector,
    extractor: &str,
    path: &str,
    result: &Result<Vec<Inventory>, ExtractError>,
) {
    let result = match result {
        Ok(_) => FileExtractedResult::Success,
        Err(ExtractError::Cancelled) => FileExtractedResult::ErrorCancelled,
        Err(_) => FileExtractedResult::ErrorUnknown,
    };
    stats.after_file_extracted(
        extractor,
        &FileExtractedStats {
            path: path.to_string(),
            result,
        },
    );
}
