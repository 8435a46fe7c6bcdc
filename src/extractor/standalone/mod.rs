//! Standalone extractors: run once per scan against live OS state.

pub mod windows;

use super::Extractor;
use crate::error::ExtractError;
use crate::model::Inventory;
use crate::platform::Platform;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Input for a standalone extraction. No file is presented.
#[derive(Debug, Clone, Default)]
pub struct StandaloneInput {
    pub cancel: CancellationToken,
}

impl StandaloneInput {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

/// An extractor that queries OS-level state itself.
///
/// Implementations built for another platform still satisfy this trait but
/// fail every call with [`ExtractError::UnsupportedPlatform`].
#[async_trait]
pub trait StandaloneExtractor: Extractor {
    /// Platforms this extractor produces results on.
    fn supported_platforms(&self) -> &[Platform];

    fn is_supported(&self) -> bool {
        self.supported_platforms().contains(&Platform::current())
    }

    async fn extract(&self, input: &StandaloneInput) -> Result<Vec<Inventory>, ExtractError>;
}
