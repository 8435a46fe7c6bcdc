use super::{collect_patch_levels, patch_purl, Config, NAME};
use crate::error::ExtractError;
use crate::extractor::{Extractor, StandaloneExtractor, StandaloneInput};
use crate::model::Inventory;
use crate::platform::Platform;
use crate::purl::PackageUrl;
use crate::winreg::{RegistryOpener, Scoped};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct RegPatchLevelExtractor {
    registry: Option<Arc<dyn RegistryOpener>>,
}

impl RegPatchLevelExtractor {
    pub fn new(config: Config) -> Self {
        Self {
            registry: config.registry,
        }
    }
}

impl Default for RegPatchLevelExtractor {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Extractor for RegPatchLevelExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> u32 {
        0
    }

    fn to_purl(&self, inventory: &Inventory) -> Result<PackageUrl, ExtractError> {
        Ok(patch_purl(inventory))
    }

    fn to_cpes(&self, _inventory: &Inventory) -> Result<Vec<String>, ExtractError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl StandaloneExtractor for RegPatchLevelExtractor {
    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    async fn extract(&self, input: &StandaloneInput) -> Result<Vec<Inventory>, ExtractError> {
        let opener = self
            .registry
            .clone()
            .ok_or_else(|| ExtractError::RegistryUnavailable {
                extractor: NAME.to_string(),
            })?;
        let cancel = input.cancel.clone();

        let walk = tokio::task::spawn_blocking(move || {
            let registry = Scoped::new(opener.open()?);
            collect_patch_levels(&*registry, &cancel)
        });

        let inventories = tokio::select! {
            biased;
            _ = input.cancel.cancelled() => return Err(ExtractError::Cancelled),
            joined = walk => joined.map_err(|e| ExtractError::Task(e.to_string()))??,
        };

        debug!(count = inventories.len(), "collected windows patch levels");
        Ok(inventories)
    }
}
