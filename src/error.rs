//! Error types.
//!
//! Library code returns these typed errors; the CLI wraps them in
//! `anyhow::Error` at the application boundary.
//!
//! - [`ExtractError`]: a single extractor failed on a single input. Never
//!   fatal to a scan.
//! - [`RegistryError`]: OS-state access through [`crate::winreg`].
//! - [`ScanError`]: the scan itself could not finish. Carries whatever was
//!   aggregated before the failure.
//! - [`ConfigError`]: loading or validating [`crate::Config`].

use crate::model::ScanResult;
use crate::platform::Platform;

/// Failure of one extractor on one input.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parse error: {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("extraction cancelled")]
    Cancelled,

    #[error("{extractor}: only supported on {required}")]
    UnsupportedPlatform {
        extractor: String,
        required: Platform,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{extractor}: no registry backend configured")]
    RegistryUnavailable { extractor: String },

    #[error("{extractor}: cannot convert inventory: {reason}")]
    Unconvertible { extractor: String, reason: String },

    #[error("extraction task failed: {0}")]
    Task(String),
}

impl ExtractError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExtractError::Cancelled)
    }

    pub fn is_unsupported_platform(&self) -> bool {
        matches!(self, ExtractError::UnsupportedPlatform { .. })
    }
}

/// Failure reported by a [`crate::winreg::Registry`] implementation.
///
/// "Not found" and I/O failures stay distinct so callers can decide whether
/// an absent key means "nothing installed" or "something went wrong".
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to open key: {0}")]
    KeyNotFound(String),

    #[error("registry io error: {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid registry value {value}: {reason}")]
    InvalidData { value: String, reason: String },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::KeyNotFound(_))
    }
}

/// Scan-fatal error.
///
/// Walk and cancellation failures still hand back the partial result that
/// was aggregated before the scan stopped.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("cannot walk scan root {root}: {source}")]
    Walk {
        root: String,
        source: std::io::Error,
        partial: Box<ScanResult>,
    },

    #[error("scan cancelled")]
    Cancelled { partial: Box<ScanResult> },

    #[error("scan runtime error: {0}")]
    Runtime(String),
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled { .. })
    }

    /// Returns the best-effort result aggregated before the failure.
    pub fn partial(&self) -> Option<&ScanResult> {
        match self {
            ScanError::Walk { partial, .. } | ScanError::Cancelled { partial } => Some(partial),
            ScanError::Runtime(_) => None,
        }
    }

    pub fn into_partial(self) -> Option<ScanResult> {
        match self {
            ScanError::Walk { partial, .. } | ScanError::Cancelled { partial } => Some(*partial),
            ScanError::Runtime(_) => None,
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown extractor: {0}")]
    UnknownExtractor(String),

    #[error("config error: {field}: {reason}")]
    Invalid { field: String, reason: String },
}
