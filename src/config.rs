//! Configuration file handling.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/invscan/config.toml`
//! - macOS: `~/Library/Application Support/invscan/config.toml`
//! - Windows: `%APPDATA%\invscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! max_file_size_bytes = 10485760
//! max_concurrency = 8
//! extractors = ["dotnet/packageslockjson"]
//! skip_dirs = [".git", "node_modules", "bin*"]
//! default_format = "table"
//! ```

use crate::error::ConfigError;
use crate::extractor::ExtractorConfig;
use crate::output::OutputFormat;
use crate::platform;
use crate::scanner::ScanConfig;
use crate::stats::StatsCollector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application configuration.
///
/// Every field has a default, so a partial (or missing) file is valid.
///
/// ```no_run
/// use invscan::Config;
///
/// let config = Config::load().unwrap();
/// println!("Concurrency: {}", config.max_concurrency);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files larger than this are not extracted. 0 means unlimited.
    ///
    /// Default: 0
    pub max_file_size_bytes: u64,

    /// Maximum number of extractions running at once.
    ///
    /// Default: 8
    pub max_concurrency: usize,

    /// Extractors to run, by name. Empty runs every built-in extractor.
    pub extractors: Vec<String>,

    /// Directory names that are not descended into. Supports `*`.
    ///
    /// Default: `.git`, `node_modules`
    pub skip_dirs: Vec<String>,

    /// Output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    pub default_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 0,
            max_concurrency: 8,
            extractors: Vec::new(),
            skip_dirs: vec![".git".to_string(), "node_modules".to_string()],
            default_format: "table".to_string(),
        }
    }
}

/// Simple glob matching (supports * as wildcard).
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Prefix (before first *)
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Suffix (after last *)
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }

    true
}

impl Config {
    /// Loads configuration from [`Config::config_path`].
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads and validates configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration to [`Config::config_path`], creating the
    /// parent directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// The default configuration as TOML, for `invscan config`.
    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        self.default_format
            .parse::<OutputFormat>()
            .map_err(|reason| ConfigError::Invalid {
                field: "default_format".to_string(),
                reason,
            })?;

        if let Some(empty) = self.skip_dirs.iter().find(|p| p.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "skip_dirs".to_string(),
                reason: format!("empty pattern {:?}", empty),
            });
        }

        Ok(())
    }

    pub fn scan_config(&self, stats: Arc<dyn StatsCollector>) -> ScanConfig {
        ScanConfig {
            max_concurrency: self.max_concurrency,
            skip_dirs: self.skip_dirs.clone(),
            stats,
        }
    }

    pub fn extractor_config(&self, stats: Arc<dyn StatsCollector>) -> ExtractorConfig {
        ExtractorConfig {
            stats,
            max_file_size_bytes: self.max_file_size_bytes,
            registry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::NoopCollector;
    use tempfile::TempDir;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("node_modules", "node_modules"));
        assert!(!glob_match("node_modules", "node_modules2"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("bin*", "bin"));
        assert!(glob_match("bin*", "bin-debug"));
        assert!(!glob_match("bin*", "obj"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*.cache", "nuget.cache"));
        assert!(!glob_match("*.cache", "nuget"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*test*", "test"));
        assert!(glob_match("*test*", "my-test-data"));
        assert!(!glob_match("*test*", "src"));
    }

    #[test]
    fn test_glob_match_middle() {
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxcyyb"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.max_file_size_bytes, 0);
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.default_format, "table");
        assert!(config.extractors.is_empty());
        assert_eq!(config.skip_dirs, vec![".git", "node_modules"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "max_file_size_bytes = 1024\nextractors = [\"dotnet/depsjson\"]\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.max_file_size_bytes, 1024);
        assert_eq!(config.extractors, vec!["dotnet/depsjson"]);
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "max_concurrency = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "max_concurrency"));

        fs::write(&path, "default_format = \"sarif\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "default_format"));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_concurrency = \"eight\"\n").unwrap();
        assert!(matches!(
            Config::load_from(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            max_concurrency: 2,
            default_format: "json".to_string(),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_generate_default_config_parses() {
        let text = Config::generate_default_config();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_derived_configs() {
        let config = Config {
            max_file_size_bytes: 10,
            max_concurrency: 3,
            ..Config::default()
        };
        let scan = config.scan_config(Arc::new(NoopCollector));
        assert_eq!(scan.max_concurrency, 3);
        assert_eq!(scan.skip_dirs, config.skip_dirs);

        let extractors = config.extractor_config(Arc::new(NoopCollector));
        assert_eq!(extractors.max_file_size_bytes, 10);
        assert!(extractors.registry.is_none());
    }
}
