//! Extractor for NuGet `packages.lock.json` files.
//!
//! ```json
//! {
//!   "version": 1,
//!   "dependencies": {
//!     "net6.0": {
//!       "Core.Dep": { "type": "Direct", "requested": "[1.24.0, )", "resolved": "1.24.0" }
//!     }
//!   }
//! }
//! ```
//!
//! One inventory is reported per (target framework, package) pair, with the
//! `resolved` version as written. Entries without `resolved` (project
//! references) are kept with an empty version; their `type` stays in the
//! metadata.

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

pub const NAME: &str = "dotnet/packageslockjson";

const FILE_NAME: &str = "packages.lock.json";

#[derive(Clone)]
pub struct Config {
    pub stats: Arc<dyn StatsCollector>,
    /// 0 means unlimited.
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

pub struct PackagesLockJsonExtractor {
    stats: Arc<dyn StatsCollector>,
    requirement: FileRequirement,
}

impl PackagesLockJsonExtractor {
    pub fn new(config: Config) -> Self {
        Self {
            stats: config.stats,
            requirement: FileRequirement::new(
                NamePattern::Exact(FILE_NAME),
                config.max_file_size_bytes,
            ),
        }
    }

    async fn extract_from_input(
        &self,
        input: &mut ScanInput,
    ) -> Result<Vec<Inventory>, ExtractError> {
        let content = input.read_all().await?;
        let lockfile: PackagesLock =
            serde_json::from_slice(&content).map_err(|e| ExtractError::Parse {
                path: input.path.clone(),
                reason: e.to_string(),
            })?;

        if input.cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let mut inventories = Vec::new();
        for (framework, packages) in lockfile.dependencies {
            for (name, package) in packages {
                if package.resolved.is_none() {
                    debug!(path = %input.path, package = %name, "no resolved version");
                }

                let inventory = Inventory::new(name, package.resolved.unwrap_or_default())
                    .with_location(input.path.clone())
                    .with_metadata(Metadata::PackagesLock {
                        target_framework: framework.clone(),
                        dependency_type: package.dependency_type,
                    });
                inventories.push(inventory);
            }
        }

        Ok(inventories)
    }
}

impl Default for PackagesLockJsonExtractor {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[derive(Deserialize)]
struct PackagesLock {
    #[serde(default)]
    dependencies: BTreeMap<String, BTreeMap<String, LockedPackage>>,
}

#[derive(Deserialize)]
struct LockedPackage {
    resolved: Option<String>,
    #[serde(rename = "type")]
    dependency_type: Option<String>,
}

impl Extractor for PackagesLockJsonExtractor {
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
impl FileExtractor for PackagesLockJsonExtractor {
    fn file_required(&self, path: &str, info: &FileInfo) -> bool {
        self.requirement.check(NAME, path, info, self.stats.as_ref())
    }

    async fn extract(&self, mut input: ScanInput) -> Result<Vec<Inventory>, ExtractError> {
        let result = self.extract_from_input(&mut input).await;
        report_extracted(self.stats.as_ref(), NAME, &input.path, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purl::PurlType;
    use crate::stats::testing::RecordingCollector;
    use crate::stats::{FileExtractedResult, FileRequiredResult};
    use std::io::Cursor;
    use tokio_util::sync::CancellationToken;

    const KIB: u64 = 1024;
    const VALID: &[u8] =
        include_bytes!("../../../../testdata/dotnet/packageslockjson/valid/packages.lock.json");
    const INVALID: &[u8] =
        include_bytes!("../../../../testdata/dotnet/packageslockjson/invalid/invalid");

    fn extractor_with(stats: Arc<RecordingCollector>, max_file_size_bytes: u64) -> PackagesLockJsonExtractor {
        PackagesLockJsonExtractor::new(Config {
            stats,
            max_file_size_bytes,
        })
    }

    fn input(path: &str, content: &'static [u8]) -> ScanInput {
        ScanInput::new(
            path,
            FileInfo::new(FILE_NAME, content.len() as u64),
            Box::new(Cursor::new(content)),
        )
    }

    #[test]
    fn test_file_required() {
        struct Case {
            name: &'static str,
            path: &'static str,
            size: u64,
            max: u64,
            want_required: bool,
            want_result: Option<FileRequiredResult>,
        }

        let cases = [
            Case {
                name: "some project's packages.lock.json",
                path: "project/packages.lock.json",
                size: 100 * KIB,
                max: 0,
                want_required: true,
                want_result: Some(FileRequiredResult::Ok),
            },
            Case {
                name: "just packages.lock.json",
                path: "packages.lock.json",
                size: 100 * KIB,
                max: 0,
                want_required: true,
                want_result: Some(FileRequiredResult::Ok),
            },
            Case {
                name: "non packages.lock.json",
                path: "project/some.csproj",
                size: 100 * KIB,
                max: 0,
                want_required: false,
                want_result: None,
            },
            Case {
                name: "required if file size < max file size",
                path: "project/packages.lock.json",
                size: 100 * KIB,
                max: 1000 * KIB,
                want_required: true,
                want_result: Some(FileRequiredResult::Ok),
            },
            Case {
                name: "required if file size == max file size",
                path: "project/packages.lock.json",
                size: 1000 * KIB,
                max: 1000 * KIB,
                want_required: true,
                want_result: Some(FileRequiredResult::Ok),
            },
            Case {
                name: "not required if file size > max file size",
                path: "project/packages.lock.json",
                size: 1000 * KIB,
                max: 100 * KIB,
                want_required: false,
                want_result: Some(FileRequiredResult::SizeLimitExceeded),
            },
            Case {
                name: "required if max file size set to 0",
                path: "project/packages.lock.json",
                size: 1000 * KIB,
                max: 0,
                want_required: true,
                want_result: Some(FileRequiredResult::Ok),
            },
        ];

        for case in cases {
            let stats = Arc::new(RecordingCollector::default());
            let extractor = extractor_with(Arc::clone(&stats), case.max);
            let base = case.path.rsplit('/').next().unwrap_or(case.path);

            let got = extractor.file_required(case.path, &FileInfo::new(base, case.size));
            assert_eq!(got, case.want_required, "{}", case.name);
            assert_eq!(stats.required(case.path), case.want_result, "{}", case.name);
        }
    }

    #[tokio::test]
    async fn test_extract_valid() {
        let stats = Arc::new(RecordingCollector::default());
        let extractor = extractor_with(Arc::clone(&stats), 0);
        let path = "testdata/valid/packages.lock.json";

        let mut got = extractor.extract(input(path, VALID)).await.unwrap();
        got.sort_by(|a, b| a.name.cmp(&b.name));

        let want = [
            ("Another.Longer.Name.Dep", "4.5.4"),
            ("Core.Dep", "1.24.0"),
            ("Some.Dep.Five", "4.7.2"),
            ("Some.Dep.Four", "4.5.0"),
            ("Some.Dep.One", "1.1.1"),
            ("Some.Dep.Three", "1.0.2"),
            ("Some.Dep.Two", "4.6.0"),
            ("Some.Longer.Name.Dep", "4.7.2"),
        ];
        assert_eq!(got.len(), want.len());
        for (inv, (name, version)) in got.iter().zip(want) {
            assert_eq!(inv.name, name);
            assert_eq!(inv.version, version);
            assert_eq!(inv.locations, vec![path.to_string()]);
        }
        assert_eq!(stats.extracted(path), Some(FileExtractedResult::Success));
    }

    #[tokio::test]
    async fn test_extract_keeps_framework_metadata() {
        let extractor = PackagesLockJsonExtractor::default();
        let got = extractor
            .extract(input("packages.lock.json", VALID))
            .await
            .unwrap();
        let core = got.iter().find(|i| i.name == "Core.Dep").unwrap();
        assert_eq!(
            core.metadata,
            Some(Metadata::PackagesLock {
                target_framework: "net6.0".to_string(),
                dependency_type: Some("Direct".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_extract_invalid() {
        let stats = Arc::new(RecordingCollector::default());
        let extractor = extractor_with(Arc::clone(&stats), 0);
        let path = "testdata/invalid/invalid";

        let err = extractor.extract(input(path, INVALID)).await.unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
        assert_eq!(stats.extracted(path), Some(FileExtractedResult::ErrorUnknown));
    }

    #[tokio::test]
    async fn test_extract_keeps_unresolved_projects() {
        const PROJECT_REF: &[u8] = br#"{
            "version": 1,
            "dependencies": {
                "net8.0": {
                    "Lib": { "type": "Project" },
                    "Dep": { "type": "Direct", "resolved": "2.0.0-beta.1" }
                }
            }
        }"#;
        let got = PackagesLockJsonExtractor::default()
            .extract(input("packages.lock.json", PROJECT_REF))
            .await
            .unwrap();
        assert_eq!(got.len(), 2);

        let dep = got.iter().find(|i| i.name == "Dep").unwrap();
        assert_eq!(dep.version, "2.0.0-beta.1");

        let lib = got.iter().find(|i| i.name == "Lib").unwrap();
        assert_eq!(lib.version, "");
        assert_eq!(lib.locations, vec!["packages.lock.json".to_string()]);
        assert_eq!(
            lib.metadata,
            Some(Metadata::PackagesLock {
                target_framework: "net8.0".to_string(),
                dependency_type: Some("Project".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_extract_cancelled() {
        let stats = Arc::new(RecordingCollector::default());
        let extractor = extractor_with(Arc::clone(&stats), 0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = extractor
            .extract(input("packages.lock.json", VALID).with_cancel(cancel))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(
            stats.extracted("packages.lock.json"),
            Some(FileExtractedResult::ErrorCancelled)
        );
    }

    #[test]
    fn test_to_purl() {
        let extractor = PackagesLockJsonExtractor::default();
        let inventory = Inventory::new("Name", "1.2.3").with_location("location");

        let got = extractor.to_purl(&inventory).unwrap();
        assert_eq!(got.purl_type, PurlType::Nuget);
        assert_eq!(got.name, "Name");
        assert_eq!(got.version.as_deref(), Some("1.2.3"));
        assert_eq!(got, extractor.to_purl(&inventory).unwrap());
        assert!(extractor.to_cpes(&inventory).unwrap().is_empty());
    }
}
