//! Explicit collection of the extractors a scan runs.
//!
//! Nothing registers itself: callers build an [`ExtractorRegistry`] at
//! startup, either from [`ExtractorRegistry::builtin`] or by registering
//! extractors one at a time, and hand it to the
//! [`Scanner`](crate::scanner::Scanner).

use super::filesystem::dotnet::{depsjson, packageslockjson, DepsJsonExtractor, PackagesLockJsonExtractor};
use super::standalone::windows::regpatchlevel::{self, RegPatchLevelExtractor};
use super::{FileExtractor, StandaloneExtractor};
use crate::error::{ConfigError, ExtractError};
use crate::model::{Descriptor, InventoryRecord};
use crate::purl::PackageUrl;
use crate::stats::{NoopCollector, StatsCollector};
use crate::winreg::RegistryOpener;
use std::sync::Arc;
use tracing::warn;

/// Settings shared by the built-in extractors.
#[derive(Clone)]
pub struct ExtractorConfig {
    pub stats: Arc<dyn StatsCollector>,
    /// 0 means unlimited.
    pub max_file_size_bytes: u64,
    /// Registry backend for standalone Windows extractors.
    pub registry: Option<Arc<dyn RegistryOpener>>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            stats: Arc::new(NoopCollector),
            max_file_size_bytes: 0,
            registry: None,
        }
    }
}

/// File-based and standalone extractors, each in registration order.
///
/// Names are unique; registering a name twice replaces the earlier
/// extractor in place.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    file: Vec<Arc<dyn FileExtractor>>,
    standalone: Vec<Arc<dyn StandaloneExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every extractor shipped with the crate.
    pub fn builtin(config: &ExtractorConfig) -> Self {
        let mut registry = Self::new();
        registry
            .register_file(Arc::new(PackagesLockJsonExtractor::new(
                packageslockjson::Config {
                    stats: Arc::clone(&config.stats),
                    max_file_size_bytes: config.max_file_size_bytes,
                },
            )))
            .register_file(Arc::new(DepsJsonExtractor::new(depsjson::Config {
                stats: Arc::clone(&config.stats),
                max_file_size_bytes: config.max_file_size_bytes,
            })))
            .register_standalone(Arc::new(RegPatchLevelExtractor::new(
                regpatchlevel::Config {
                    registry: config.registry.clone(),
                },
            )));
        registry
    }

    pub fn register_file(&mut self, extractor: Arc<dyn FileExtractor>) -> &mut Self {
        match self.file.iter().position(|e| e.name() == extractor.name()) {
            Some(i) => {
                warn!(extractor = extractor.name(), "replacing registered extractor");
                self.file[i] = extractor;
            }
            None => self.file.push(extractor),
        }
        self
    }

    pub fn register_standalone(&mut self, extractor: Arc<dyn StandaloneExtractor>) -> &mut Self {
        match self
            .standalone
            .iter()
            .position(|e| e.name() == extractor.name())
        {
            Some(i) => {
                warn!(extractor = extractor.name(), "replacing registered extractor");
                self.standalone[i] = extractor;
            }
            None => self.standalone.push(extractor),
        }
        self
    }

    /// Keeps only the named extractors. An empty list keeps everything.
    pub fn filtered(&self, names: &[String]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        if let Some(unknown) = names.iter().find(|n| !self.contains(n)) {
            return Err(ConfigError::UnknownExtractor(unknown.clone()));
        }

        let enabled = |name: &str| names.iter().any(|n| n == name);
        Ok(Self {
            file: self
                .file
                .iter()
                .filter(|e| enabled(e.name()))
                .cloned()
                .collect(),
            standalone: self
                .standalone
                .iter()
                .filter(|e| enabled(e.name()))
                .cloned()
                .collect(),
        })
    }

    pub fn file_extractors(&self) -> &[Arc<dyn FileExtractor>] {
        &self.file
    }

    pub fn standalone_extractors(&self) -> &[Arc<dyn StandaloneExtractor>] {
        &self.standalone
    }

    /// All names, file-based first.
    pub fn names(&self) -> Vec<&str> {
        self.file
            .iter()
            .map(|e| e.name())
            .chain(self.standalone.iter().map(|e| e.name()))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptor(name).is_some()
    }

    pub fn descriptor(&self, name: &str) -> Option<Descriptor> {
        self.file
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.descriptor())
            .or_else(|| {
                self.standalone
                    .iter()
                    .find(|e| e.name() == name)
                    .map(|e| e.descriptor())
            })
    }

    pub fn len(&self) -> usize {
        self.file.len() + self.standalone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts a record to a Package URL using the extractor that produced it.
    pub fn to_purl(&self, record: &InventoryRecord) -> Result<PackageUrl, ExtractError> {
        let name = record.extractor.name.as_str();
        if let Some(e) = self.file.iter().find(|e| e.name() == name) {
            return e.to_purl(&record.inventory);
        }
        if let Some(e) = self.standalone.iter().find(|e| e.name() == name) {
            return e.to_purl(&record.inventory);
        }
        Err(not_registered(name))
    }

    /// Converts a record to CPEs using the extractor that produced it.
    pub fn to_cpes(&self, record: &InventoryRecord) -> Result<Vec<String>, ExtractError> {
        let name = record.extractor.name.as_str();
        if let Some(e) = self.file.iter().find(|e| e.name() == name) {
            return e.to_cpes(&record.inventory);
        }
        if let Some(e) = self.standalone.iter().find(|e| e.name() == name) {
            return e.to_cpes(&record.inventory);
        }
        Err(not_registered(name))
    }
}

fn not_registered(name: &str) -> ExtractError {
    ExtractError::Unconvertible {
        extractor: name.to_string(),
        reason: "extractor not registered".to_string(),
    }
}
