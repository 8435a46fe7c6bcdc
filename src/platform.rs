//! Platform detection and platform-specific paths.
//!
//! Standalone extractors are compiled per platform; [`Platform`] is what
//! they report when invoked on a build they do not support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Operating system family an extractor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

impl Platform {
    /// Returns the platform this binary was built for.
    pub fn current() -> Self {
        #[cfg(target_os = "linux")]
        return Platform::Linux;
        #[cfg(target_os = "macos")]
        return Platform::MacOS;
        #[cfg(target_os = "windows")]
        return Platform::Windows;
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOS => "macos",
            Platform::Windows => "windows",
        }
    }

    /// All platforms, for extractors that run everywhere.
    pub fn all() -> &'static [Platform] {
        &[Platform::Linux, Platform::MacOS, Platform::Windows]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns the configuration directory for invscan.
///
/// Platform-specific locations:
/// - Linux: `~/.config/invscan/`
/// - macOS: `~/Library/Application Support/invscan/`
/// - Windows: `%APPDATA%\invscan\`
///
/// Falls back to `./invscan/` if no configuration directory can be determined.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invscan")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_platform_is_listed() {
        assert!(Platform::all().contains(&Platform::current()));
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::Windows.to_string(), "windows");
        assert_eq!(Platform::MacOS.to_string(), "macos");
    }

    #[test]
    fn test_config_dir_ends_with_crate_name() {
        assert!(config_dir().ends_with("invscan"));
    }
}
