//! .NET dependency manifests.
//!
//! Both extractors report NuGet packages and share identifier conversion.

pub mod depsjson;
pub mod packageslockjson;

pub use depsjson::DepsJsonExtractor;
pub use packageslockjson::PackagesLockJsonExtractor;

use crate::error::ExtractError;
use crate::model::{Inventory, Metadata};
use crate::purl::{PackageUrl, PurlType};

/// Local project references are not published on NuGet and get no PURL.
fn nuget_purl(extractor: &str, inventory: &Inventory) -> Result<PackageUrl, ExtractError> {
    if is_project(inventory) {
        return Err(ExtractError::Unconvertible {
            extractor: extractor.to_string(),
            reason: format!("{} is a project reference, not a NuGet package", inventory.name),
        });
    }

    let purl = PackageUrl::new(PurlType::Nuget, inventory.name.clone());
    if inventory.version.is_empty() {
        Ok(purl)
    } else {
        Ok(purl.with_version(inventory.version.clone()))
    }
}

fn is_project(inventory: &Inventory) -> bool {
    match &inventory.metadata {
        Some(Metadata::DepsJson { package_type }) => package_type.eq_ignore_ascii_case("project"),
        Some(Metadata::PackagesLock {
            dependency_type: Some(kind),
            ..
        }) => kind.eq_ignore_ascii_case("project"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nuget_purl_without_version() {
        let purl = nuget_purl("test", &Inventory::new("Lib", "")).unwrap();
        assert_eq!(purl.version, None);
        assert_eq!(purl.to_string(), "pkg:nuget/Lib");
    }

    #[test]
    fn test_project_references_are_unconvertible() {
        let deps = Inventory::new("App", "1.0.0").with_metadata(Metadata::DepsJson {
            package_type: "project".to_string(),
        });
        let lock = Inventory::new("Lib", "").with_metadata(Metadata::PackagesLock {
            target_framework: "net8.0".to_string(),
            dependency_type: Some("Project".to_string()),
        });
        let package = Inventory::new("Serilog", "3.1.1").with_metadata(Metadata::DepsJson {
            package_type: "package".to_string(),
        });

        assert!(matches!(
            nuget_purl("test", &deps),
            Err(ExtractError::Unconvertible { .. })
        ));
        assert!(matches!(
            nuget_purl("test", &lock),
            Err(ExtractError::Unconvertible { .. })
        ));
        assert_eq!(
            nuget_purl("test", &package).unwrap().to_string(),
            "pkg:nuget/Serilog@3.1.1"
        );
    }
}
