//! Core data types for inventories and scan results.
//!
//! - [`Inventory`] - One discovered software unit
//! - [`Metadata`] - Ecosystem-specific extras used for identifier conversion
//! - [`Descriptor`] - Identity of the extractor that produced an inventory
//! - [`ScanResult`] - Everything a scan produced, including per-file failures
//!
//! # Example
//!
//! ```
//! use invscan::model::{Descriptor, Inventory, InventoryRecord};
//!
//! let inventory = Inventory::new("Newtonsoft.Json", "13.0.1")
//!     .with_location("src/App/packages.lock.json");
//! let record = InventoryRecord::new(Descriptor::new("dotnet/packageslockjson", 0), inventory);
//!
//! assert_eq!(record.inventory.locations, vec!["src/App/packages.lock.json"]);
//! ```

mod inventory;
mod result;

pub use inventory::*;
pub use result::*;
