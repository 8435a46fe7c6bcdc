//! Extractor plugins.
//!
//! Every extractor implements [`Extractor`] plus exactly one of two
//! capability traits:
//!
//! - [`FileExtractor`]: handed one file at a time during a filesystem walk
//! - [`StandaloneExtractor`]: run once per scan against live OS state
//!
//! # Available Extractors
//!
//! | Extractor | Kind | Input | Platforms |
//! |-----------|------|-------|-----------|
//! | [`dotnet/packageslockjson`](filesystem::dotnet::packageslockjson) | file | `packages.lock.json` | All |
//! | [`dotnet/depsjson`](filesystem::dotnet::depsjson) | file | `*.deps.json` | All |
//! | [`windows/regpatchlevel`](standalone::windows::regpatchlevel) | standalone | Component Based Servicing registry | Windows |
//!
//! Extractors are collected in an explicit [`ExtractorRegistry`] that the
//! [`Scanner`](crate::scanner::Scanner) receives by reference.

pub mod filesystem;
pub mod registry;
pub mod standalone;

pub use filesystem::{FileExtractor, FileInfo, ScanInput};
pub use registry::{ExtractorConfig, ExtractorRegistry};
pub use standalone::{StandaloneExtractor, StandaloneInput};

use crate::error::ExtractError;
use crate::model::{Descriptor, Inventory};
use crate::purl::PackageUrl;

/// Identity and identifier conversion shared by all extractors.
///
/// `to_purl` and `to_cpes` are pure: they look only at the inventory and
/// return the same answer every time.
pub trait Extractor: Send + Sync {
    /// Unique, namespaced name, e.g. `dotnet/packageslockjson`.
    fn name(&self) -> &str;

    /// Bumped whenever the output of the extractor changes.
    fn version(&self) -> u32;

    /// Converts an inventory produced by this extractor into a Package URL.
    fn to_purl(&self, inventory: &Inventory) -> Result<PackageUrl, ExtractError>;

    /// Converts an inventory produced by this extractor into CPE strings.
    fn to_cpes(&self, inventory: &Inventory) -> Result<Vec<String>, ExtractError>;

    fn descriptor(&self) -> Descriptor {
        Descriptor::new(self.name(), self.version())
    }
}
