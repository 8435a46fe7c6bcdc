pub mod config;
pub mod error;
pub mod extractor;
pub mod model;
pub mod output;
pub mod platform;
pub mod purl;
pub mod scanner;
pub mod stats;
pub mod winreg;

pub use config::Config;
pub use error::{ConfigError, ExtractError, RegistryError, ScanError};
pub use extractor::{Extractor, ExtractorConfig, ExtractorRegistry};
pub use model::{Descriptor, Inventory, InventoryRecord, ScanResult};
pub use platform::Platform;
pub use purl::{PackageUrl, PurlType};
pub use scanner::{ScanConfig, Scanner};
