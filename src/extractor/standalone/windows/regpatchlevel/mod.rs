//! Windows patch level from the Component Based Servicing registry.
//!
//! Each subkey of
//! `SOFTWARE\Microsoft\Windows\CurrentVersion\Component Based Servicing\Packages`
//! is a servicing package named like
//! `Package_for_KB5020683~31bf3856ad364e35~amd64~~19041.2193.1.0`. Packages
//! that are installed (or superseded by a later installed one) and visible
//! are reported as `Package_for_KB5020683` at version `19041.2193.1.0`.
//!
//! The registry walk is platform independent and runs against any
//! [`Registry`]; only the extractor that opens the live hive is Windows-only.
//! Other builds get a stub that reports an unsupported platform.

#[cfg(windows)]
mod supported;
#[cfg(windows)]
pub use supported::RegPatchLevelExtractor;

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use unsupported::RegPatchLevelExtractor;

use crate::error::{ExtractError, RegistryError};
use crate::model::{Inventory, Metadata};
use crate::purl::{PackageUrl, PurlType};
use crate::winreg::{read_dword, Key, Registry, RegistryOpener, Scoped};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const NAME: &str = "windows/regpatchlevel";

pub const PACKAGES_KEY: &str =
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Component Based Servicing\Packages";

/// Synthetic location attached to every inventory.
pub const LOCATION: &str = "windows-registry";

const STATE_INSTALLED: u32 = 0x70;
const STATE_SUPERSEDED: u32 = 0x50;
const VISIBLE: u32 = 1;

#[derive(Clone, Default)]
pub struct Config {
    /// Source of the SOFTWARE hive. Required on Windows.
    pub registry: Option<Arc<dyn RegistryOpener>>,
}

/// Reads every reportable servicing package from `registry`.
///
/// A missing packages key means nothing is installed. Subkeys that cannot
/// be read are skipped.
#[cfg_attr(not(any(windows, test)), allow(dead_code))]
pub(crate) fn collect_patch_levels(
    registry: &dyn Registry,
    cancel: &CancellationToken,
) -> Result<Vec<Inventory>, ExtractError> {
    let packages = match registry.open_key(PACKAGES_KEY) {
        Ok(key) => Scoped::new(key),
        Err(e) if e.is_not_found() => {
            debug!(key = PACKAGES_KEY, "no servicing packages key");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut inventories = Vec::new();
    for subkey in packages.subkeys()? {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let subkey = Scoped::new(subkey);
        match patch_from_key(&*subkey) {
            Ok(Some(inventory)) => inventories.push(inventory),
            Ok(None) => {}
            Err(e) => warn!(key = %subkey.name(), error = %e, "skipping unreadable servicing package"),
        }
    }

    Ok(inventories)
}

fn patch_from_key(key: &dyn Key) -> Result<Option<Inventory>, RegistryError> {
    let Some((name, version)) = split_package_name(key.name()) else {
        return Ok(None);
    };

    let mut state = None;
    let mut visibility = None;
    for value in key.values()? {
        match value.name() {
            "CurrentState" => state = Some(read_dword(value.as_ref())?),
            "Visibility" => visibility = Some(read_dword(value.as_ref())?),
            _ => {}
        }
    }

    let (Some(state), Some(visibility)) = (state, visibility) else {
        return Ok(None);
    };
    if visibility != VISIBLE || (state != STATE_INSTALLED && state != STATE_SUPERSEDED) {
        return Ok(None);
    }

    Ok(Some(
        Inventory::new(name, version)
            .with_location(LOCATION)
            .with_metadata(Metadata::WindowsPatch { state, visibility }),
    ))
}

/// Splits `Name~token~arch~lang~a.b.c.d` into `Name` and `a.b.c.d`.
fn split_package_name(key_name: &str) -> Option<(&str, &str)> {
    let (name, _) = key_name.split_once('~')?;
    let version = key_name.rsplit('~').next()?;

    let parts: Vec<&str> = version.split('.').collect();
    let numeric = parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

    if name.is_empty() || !numeric {
        return None;
    }
    Some((name, version))
}

#[cfg_attr(not(any(windows, test)), allow(dead_code))]
fn patch_purl(inventory: &Inventory) -> PackageUrl {
    PackageUrl::new(PurlType::Generic, inventory.name.clone())
        .with_namespace("microsoft")
        .with_version(inventory.version.clone())
}
