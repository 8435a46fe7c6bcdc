use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an extractor plugin.
///
/// `version` is a plain counter bumped whenever the extractor's output
/// changes, not a semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub version: u32,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (v{})", self.name, self.version)
    }
}

/// Ecosystem-specific data carried alongside an inventory.
///
/// Opaque to the scanner; only the extractor that produced it reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metadata {
    PackagesLock {
        target_framework: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        dependency_type: Option<String>,
    },
    DepsJson {
        package_type: String,
    },
    WindowsPatch {
        state: u32,
        visibility: u32,
    },
}

/// One discovered software package.
///
/// `version` is kept exactly as the source artifact declared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub name: String,
    pub version: String,
    pub locations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Inventory {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            locations: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// An inventory tagged with the extractor that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub extractor: Descriptor,
    #[serde(flatten)]
    pub inventory: Inventory,
}

impl InventoryRecord {
    pub fn new(extractor: Descriptor, inventory: Inventory) -> Self {
        Self {
            extractor,
            inventory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_builder_keeps_location_order() {
        let inv = Inventory::new("Core.Dep", "1.24.0")
            .with_location("b/packages.lock.json")
            .with_location("a/packages.lock.json");
        assert_eq!(
            inv.locations,
            vec!["b/packages.lock.json", "a/packages.lock.json"]
        );
        assert_eq!(inv.to_string(), "Core.Dep@1.24.0");
    }

    #[test]
    fn test_inventory_version_is_verbatim() {
        let inv = Inventory::new("Some.Dep", " [1.0.2, ) ");
        assert_eq!(inv.version, " [1.0.2, ) ");
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = InventoryRecord::new(
            Descriptor::new("dotnet/depsjson", 0),
            Inventory::new("App", "1.0.0").with_metadata(Metadata::DepsJson {
                package_type: "project".to_string(),
            }),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "App");
        assert_eq!(json["extractor"]["name"], "dotnet/depsjson");
        assert_eq!(json["metadata"]["kind"], "deps_json");
    }
}
