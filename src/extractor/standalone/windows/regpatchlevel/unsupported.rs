use super::{Config, NAME};
use crate::error::ExtractError;
use crate::extractor::{Extractor, StandaloneExtractor, StandaloneInput};
use crate::model::Inventory;
use crate::platform::Platform;
use crate::purl::PackageUrl;
use async_trait::async_trait;

/// Stand-in for builds without a Windows registry. Every operation fails.
#[derive(Debug, Default)]
pub struct RegPatchLevelExtractor;

impl RegPatchLevelExtractor {
    pub fn new(_config: Config) -> Self {
        Self
    }
}

fn unsupported() -> ExtractError {
    ExtractError::UnsupportedPlatform {
        extractor: NAME.to_string(),
        required: Platform::Windows,
    }
}

impl Extractor for RegPatchLevelExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> u32 {
        0
    }

    fn to_purl(&self, _inventory: &Inventory) -> Result<PackageUrl, ExtractError> {
        Err(unsupported())
    }

    fn to_cpes(&self, _inventory: &Inventory) -> Result<Vec<String>, ExtractError> {
        Err(unsupported())
    }
}

#[async_trait]
impl StandaloneExtractor for RegPatchLevelExtractor {
    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    async fn extract(&self, _input: &StandaloneInput) -> Result<Vec<Inventory>, ExtractError> {
        Err(unsupported())
    }
}
