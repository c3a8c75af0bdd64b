//! Contract for the external secure persistence service, plus the in-memory
//! reference implementation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::StoreError;
use crate::types::{Identifier, SecretRecord};

/// Narrow contract for the protected keystore holding secret records.
///
/// Implementations are expected to encrypt at rest and to enforce their own
/// access control independent of the in-process right check. Calls are
/// synchronous and must not suspend; platform-backed implementations may
/// briefly block. A put to one identifier must be atomic with respect to
/// concurrent reads and removals of that identifier, and must never disturb
/// records under other identifiers.
pub trait Keystore: Send + Sync {
    /// Write or overwrite the record under its identifier.
    fn put(&self, record: SecretRecord) -> Result<(), StoreError>;

    /// Load the record stored under `identifier`, failing with
    /// [`StoreError::NotFound`] when absent.
    fn get(&self, identifier: &Identifier) -> Result<SecretRecord, StoreError>;

    /// Delete the record under `identifier`, failing with
    /// [`StoreError::NotFound`] when absent.
    fn delete(&self, identifier: &Identifier) -> Result<(), StoreError>;

    /// Whether a record is currently stored under `identifier`.
    fn exists(&self, identifier: &Identifier) -> Result<bool, StoreError>;
}

impl<T: Keystore + ?Sized> Keystore for Arc<T> {
    fn put(&self, record: SecretRecord) -> Result<(), StoreError> {
        (**self).put(record)
    }

    fn get(&self, identifier: &Identifier) -> Result<SecretRecord, StoreError> {
        (**self).get(identifier)
    }

    fn delete(&self, identifier: &Identifier) -> Result<(), StoreError> {
        (**self).delete(identifier)
    }

    fn exists(&self, identifier: &Identifier) -> Result<bool, StoreError> {
        (**self).exists(identifier)
    }
}

impl<T: Keystore + ?Sized> Keystore for Box<T> {
    fn put(&self, record: SecretRecord) -> Result<(), StoreError> {
        (**self).put(record)
    }

    fn get(&self, identifier: &Identifier) -> Result<SecretRecord, StoreError> {
        (**self).get(identifier)
    }

    fn delete(&self, identifier: &Identifier) -> Result<(), StoreError> {
        (**self).delete(identifier)
    }

    fn exists(&self, identifier: &Identifier) -> Result<bool, StoreError> {
        (**self).exists(identifier)
    }
}

/// Ephemeral keystore for tests, examples, and callers that do not need
/// durability. Offers no at-rest protection.
#[derive(Default)]
pub struct MemoryKeystore {
    records: RwLock<HashMap<Identifier, SecretRecord>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Keystore for MemoryKeystore {
    fn put(&self, record: SecretRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        records.insert(record.identifier().clone(), record);
        Ok(())
    }

    fn get(&self, identifier: &Identifier) -> Result<SecretRecord, StoreError> {
        self.records
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                identifier: identifier.to_string(),
            })
    }

    fn delete(&self, identifier: &Identifier) -> Result<(), StoreError> {
        let mut records = self.records.write();
        match records.remove(identifier) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                identifier: identifier.to_string(),
            }),
        }
    }

    fn exists(&self, identifier: &Identifier) -> Result<bool, StoreError> {
        Ok(self.records.read().contains_key(identifier))
    }
}
