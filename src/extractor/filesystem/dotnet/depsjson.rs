//! Extractor for `*.deps.json` files written next to built .NET assemblies.
//!
//! Libraries are keyed as `Name/Version`:
//!
//! ```json
//! { "libraries": { "Newtonsoft.Json/13.0.1": { "type": "package" } } }
//! ```

use super::nuget_purl;
use crate::error::ExtractError;
use crate::extractor::filesystem::{
    report_extracted, FileExtractor, FileInfo, FileRequirement, NamePattern, ScanInput,
};
use crate::extractor::Extractor;
use crate::model::{Inventory, Metadata};
use crate::purl::PackageUrl;
use crate::stats::{NoopCollector, StatsCollector};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "dotnet/depsjson";

const FILE_SUFFIX: &str = ".deps.json";

#[derive(Clone)]
pub struct Config {
    pub stats: Arc<dyn StatsCollector>,
    pub max_file_size_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stats: Arc::new(NoopCollector),
            max_file_size_bytes: 0,
        }
    }
}

pub struct DepsJsonExtractor {
    stats: Arc<dyn StatsCollector>,
    requirement: FileRequirement,
}

impl DepsJsonExtractor {
    pub fn new(config: Config) -> Self {
        Self {
            stats: config.stats,
            requirement: FileRequirement::new(
                NamePattern::Suffix(FILE_SUFFIX),
                config.max_file_size_bytes,
            ),
        }
    }

    async fn extract_from_input(
        &self,
        input: &mut ScanInput,
    ) -> Result<Vec<Inventory>, ExtractError> {
        let content = input.read_all().await?;
        let deps: DepsJson = serde_json::from_slice(&content).map_err(|e| ExtractError::Parse {
            path: input.path.clone(),
            reason: e.to_string(),
        })?;

        if input.cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let mut inventories = Vec::new();
        for (key, library) in deps.libraries {
            let Some((name, version)) = split_library_key(&key) else {
                debug!(path = %input.path, library = %key, "malformed library key, skipping");
                continue;
            };

            inventories.push(
                Inventory::new(name, version)
                    .with_location(input.path.clone())
                    .with_metadata(Metadata::DepsJson {
                        package_type: library.library_type,
                    }),
            );
        }

        Ok(inventories)
    }
}

impl Default for DepsJsonExtractor {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[derive(Deserialize)]
struct DepsJson {
    #[serde(default)]
    libraries: BTreeMap<String, Library>,
}

#[derive(Deserialize)]
struct Library {
    #[serde(rename = "type", default = "default_library_type")]
    library_type: String,
}

fn default_library_type() -> String {
    "package".to_string()
}

/// Splits `Name/Version` on the last `/`.
fn split_library_key(key: &str) -> Option<(&str, &str)> {
    let (name, version) = key.rsplit_once('/')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name, version))
}

impl Extractor for DepsJsonExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> u32 {
        0
    }

    fn to_purl(&self, inventory: &Inventory) -> Result<PackageUrl, ExtractError> {
        nuget_purl(NAME, inventory)
    }

    fn to_cpes(&self, _inventory: &Inventory) -> Result<Vec<String>, ExtractError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl FileExtractor for DepsJsonExtractor {
    fn file_required(&self, path: &str, info: &FileInfo) -> bool {
        self.requirement.check(NAME, path, info, self.stats.as_ref())
    }

    async fn extract(&self, mut input: ScanInput) -> Result<Vec<Inventory>, ExtractError> {
        let result = self.extract_from_input(&mut input).await;
        report_extracted(self.stats.as_ref(), NAME, &input.path, &result);
        result
    }
}
