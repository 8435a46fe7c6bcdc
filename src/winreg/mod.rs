//! Windows registry access behind a narrow interface.
//!
//! Standalone extractors never call native registry APIs. They go through
//! three levels of traits:
//!
//! - [`Registry`]: an open hive; opens [`Key`]s by path
//! - [`Key`]: a registry key; enumerates subkeys and [`Value`]s
//! - [`Value`]: a named value holding raw bytes
//!
//! A [`RegistryOpener`] hands out hives to an extractor. The native backend
//! lives outside this crate; [`mock`] provides an in-memory implementation
//! that can be substituted without touching extractor code.
//!
//! Handles are closed when their [`Scoped`] guard drops, so every exit path
//! (including errors and cancellation) releases them.

pub mod mock;

use crate::error::RegistryError;
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// Something that holds a native resource and must be released.
///
/// `close` is idempotent: closing twice is not an error.
pub trait Handle: Send {
    fn close(&mut self) -> Result<(), RegistryError>;
}

/// An open registry hive.
pub trait Registry: Handle {
    /// Opens the key at `path`.
    ///
    /// Returns [`RegistryError::KeyNotFound`] if no such key exists.
    fn open_key(&self, path: &str) -> Result<Box<dyn Key>, RegistryError>;
}

/// A specific registry key.
pub trait Key: Handle {
    fn name(&self) -> &str;

    fn class_name(&self) -> Result<Vec<u8>, RegistryError>;

    /// Opens every subkey of this key.
    fn subkeys(&self) -> Result<Vec<Box<dyn Key>>, RegistryError>;

    fn subkey_names(&self) -> Result<Vec<String>, RegistryError>;

    fn values(&self) -> Result<Vec<Box<dyn Value>>, RegistryError>;
}

/// A value inside a key.
pub trait Value: Send {
    fn name(&self) -> &str;

    fn data(&self) -> Result<Vec<u8>, RegistryError>;
}

/// Source of registry hives for extractors.
pub trait RegistryOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn Registry>, RegistryError>;
}

/// Owns a handle and closes it on drop.
pub struct Scoped<T: Handle + ?Sized> {
    inner: Box<T>,
}

impl<T: Handle + ?Sized> Scoped<T> {
    pub fn new(inner: Box<T>) -> Self {
        Self { inner }
    }
}

impl<T: Handle + ?Sized> Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Handle + ?Sized> DerefMut for Scoped<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Handle + ?Sized> Drop for Scoped<T> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            warn!(error = %e, "failed to close registry handle");
        }
    }
}

/// Decodes a `REG_DWORD` (little-endian `u32`).
pub fn read_dword(value: &dyn Value) -> Result<u32, RegistryError> {
    let data = value.data()?;
    let bytes: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| RegistryError::InvalidData {
            value: value.name().to_string(),
            reason: format!("expected 4 bytes for DWORD, got {}", data.len()),
        })?;
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::mock::{MockKey, MockRegistry, MockValue};
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_read_dword() {
        let value = MockValue::new("CurrentState", 0x70u32.to_le_bytes().to_vec());
        assert_eq!(read_dword(&value).unwrap(), 0x70);
    }

    #[test]
    fn test_read_dword_too_short() {
        let value = MockValue::new("Visibility", vec![1, 0]);
        let err = read_dword(&value).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidData { .. }));
        assert!(err.to_string().contains("Visibility"));
    }

    struct CountingHandle {
        closes: Arc<AtomicUsize>,
    }

    impl Handle for CountingHandle {
        fn close(&mut self) -> Result<(), RegistryError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_scoped_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let _guard = Scoped::new(Box::new(CountingHandle {
                closes: Arc::clone(&closes),
            }));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_closes_on_error_path() {
        fn open_and_fail(closes: Arc<AtomicUsize>) -> Result<(), RegistryError> {
            let _guard = Scoped::new(Box::new(CountingHandle { closes }));
            Err(RegistryError::KeyNotFound("x".to_string()))
        }

        let closes = Arc::new(AtomicUsize::new(0));
        assert!(open_and_fail(Arc::clone(&closes)).is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_trait_objects() {
        let registry = MockRegistry::new().with_key("SOFTWARE", MockKey::new("SOFTWARE"));
        let hive: Scoped<dyn Registry> = Scoped::new(Box::new(registry));
        let key = Scoped::new(hive.open_key("SOFTWARE").unwrap());
        assert_eq!(key.name(), "SOFTWARE");
    }
}
