//! In-memory registry for tests.
//!
//! ```
//! use invscan::winreg::mock::{MockKey, MockRegistry, MockValue};
//! use invscan::winreg::{Key, Registry};
//!
//! let registry = MockRegistry::new().with_key(
//!     r"SOFTWARE\Vendor",
//!     MockKey::new("Vendor")
//!         .with_subkey(MockKey::new("App"))
//!         .with_value(MockValue::new("Version", b"1.0".to_vec())),
//! );
//!
//! let key = registry.open_key(r"SOFTWARE\Vendor").unwrap();
//! assert_eq!(key.subkey_names().unwrap(), vec!["App"]);
//! assert!(registry.open_key(r"SOFTWARE\Missing").is_err());
//! ```

use super::{Handle, Key, Registry, RegistryOpener, Value};
use crate::error::RegistryError;
use std::collections::HashMap;
use std::io;

/// A hive whose keys are registered up front by full path.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    keys: HashMap<String, MockKey>,
    io_errors: HashMap<String, io::ErrorKind>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, path: impl Into<String>, key: MockKey) -> Self {
        self.keys.insert(path.into(), key);
        self
    }

    /// Makes `open_key(path)` fail with an I/O error instead of "not found".
    pub fn with_io_error(mut self, path: impl Into<String>, kind: io::ErrorKind) -> Self {
        self.io_errors.insert(path.into(), kind);
        self
    }
}

impl Handle for MockRegistry {
    fn close(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }
}

impl Registry for MockRegistry {
    fn open_key(&self, path: &str) -> Result<Box<dyn Key>, RegistryError> {
        if let Some(kind) = self.io_errors.get(path) {
            return Err(RegistryError::Io {
                path: path.to_string(),
                source: io::Error::new(*kind, "mock registry failure"),
            });
        }

        match self.keys.get(path) {
            Some(key) => Ok(Box::new(key.clone())),
            None => Err(RegistryError::KeyNotFound(path.to_string())),
        }
    }
}

/// Hands out clones of one [`MockRegistry`].
#[derive(Debug, Clone, Default)]
pub struct MockRegistryOpener {
    registry: MockRegistry,
}

impl MockRegistryOpener {
    pub fn new(registry: MockRegistry) -> Self {
        Self { registry }
    }
}

impl RegistryOpener for MockRegistryOpener {
    fn open(&self) -> Result<Box<dyn Registry>, RegistryError> {
        Ok(Box::new(self.registry.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockKey {
    name: String,
    class_name: String,
    subkeys: Vec<MockKey>,
    values: Vec<MockValue>,
}

impl MockKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_subkey(mut self, subkey: MockKey) -> Self {
        self.subkeys.push(subkey);
        self
    }

    pub fn with_value(mut self, value: MockValue) -> Self {
        self.values.push(value);
        self
    }
}

impl Handle for MockKey {
    fn close(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }
}

impl Key for MockKey {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> Result<Vec<u8>, RegistryError> {
        Ok(self.class_name.as_bytes().to_vec())
    }

    fn subkeys(&self) -> Result<Vec<Box<dyn Key>>, RegistryError> {
        Ok(self
            .subkeys
            .iter()
            .map(|k| Box::new(k.clone()) as Box<dyn Key>)
            .collect())
    }

    fn subkey_names(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.subkeys.iter().map(|k| k.name.clone()).collect())
    }

    fn values(&self) -> Result<Vec<Box<dyn Value>>, RegistryError> {
        Ok(self
            .values
            .iter()
            .map(|v| Box::new(v.clone()) as Box<dyn Value>)
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockValue {
    name: String,
    data: Vec<u8>,
}

impl MockValue {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// A `REG_DWORD` value.
    pub fn dword(name: impl Into<String>, value: u32) -> Self {
        Self::new(name, value.to_le_bytes().to_vec())
    }
}

impl Value for MockValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn data(&self) -> Result<Vec<u8>, RegistryError> {
        Ok(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MockRegistry {
        MockRegistry::new().with_key(
            r"SOFTWARE\Microsoft",
            MockKey::new("Microsoft")
                .with_class_name("Vendor")
                .with_subkey(MockKey::new("Windows"))
                .with_subkey(MockKey::new("Office"))
                .with_subkey(MockKey::new("Edge"))
                .with_value(MockValue::new("Owner", b"me".to_vec())),
        )
    }

    #[test]
    fn test_open_unregistered_key_fails() {
        let err = sample().open_key(r"SOFTWARE\Google").err().unwrap();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("failed to open key"));
    }

    #[test]
    fn test_subkey_names_in_registration_order() {
        let key = sample().open_key(r"SOFTWARE\Microsoft").unwrap();
        assert_eq!(
            key.subkey_names().unwrap(),
            vec!["Windows", "Office", "Edge"]
        );
        let subkeys = key.subkeys().unwrap();
        assert_eq!(subkeys.len(), 3);
        assert_eq!(subkeys[1].name(), "Office");
    }

    #[test]
    fn test_key_contents() {
        let key = sample().open_key(r"SOFTWARE\Microsoft").unwrap();
        assert_eq!(key.name(), "Microsoft");
        assert_eq!(key.class_name().unwrap(), b"Vendor".to_vec());

        let values = key.values().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].name(), "Owner");
        assert_eq!(values[0].data().unwrap(), b"me".to_vec());
    }

    #[test]
    fn test_key_without_subkeys() {
        let registry = MockRegistry::new().with_key("Empty", MockKey::new("Empty"));
        let key = registry.open_key("Empty").unwrap();
        assert!(key.subkey_names().unwrap().is_empty());
        assert!(key.values().unwrap().is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut registry = sample();
        assert!(registry.close().is_ok());
        assert!(registry.close().is_ok());

        let mut key = registry.open_key(r"SOFTWARE\Microsoft").unwrap();
        assert!(key.close().is_ok());
        assert!(key.close().is_ok());
    }

    #[test]
    fn test_io_error_is_distinct_from_not_found() {
        let registry = sample().with_io_error(r"SOFTWARE\Locked", io::ErrorKind::PermissionDenied);
        let err = registry.open_key(r"SOFTWARE\Locked").err().unwrap();
        assert!(matches!(err, RegistryError::Io { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_opener_hands_out_registry() {
        let opener = MockRegistryOpener::new(sample());
        let registry = opener.open().unwrap();
        assert!(registry.open_key(r"SOFTWARE\Microsoft").is_ok());
    }
}
