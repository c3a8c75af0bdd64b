//! Keystore backed by the platform credential store.
//!
//! Each identifier maps to one credential entry under a configurable service
//! name; the record travels as JSON with a base64 payload. The platform store
//! provides encryption at rest and its own access control, independent of the
//! in-process right check.
//!
//! Platform calls are synchronous and may briefly block; callers on an async
//! runtime that care should wrap operations in `spawn_blocking`.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use keyring::Entry;
use parking_lot::RwLock;
use rightvault_core::{Identifier, Keystore, SecretRecord, StoreError};
use tracing::{debug, warn};

const ENV_SERVICE: &str = "RIGHTVAULT_KEYRING_SERVICE";
const DEFAULT_SERVICE: &str = "rightvault";

/// [`Keystore`] over the operating system's credential store.
pub struct KeyringKeystore {
    service: String,
    // One credential handle per identifier, evicted when its record is
    // deleted.
    entries: RwLock<HashMap<Identifier, Arc<Entry>>>,
}

impl KeyringKeystore {
    /// Keystore scoped to `service`, the name grouping this application's
    /// entries in the platform store.
    pub fn new(service: impl Into<String>) -> Result<Self, StoreError> {
        let service = service.into();
        if service.trim().is_empty() {
            return Err(StoreError::Storage(
                "keyring service name must not be empty".into(),
            ));
        }
        Ok(KeyringKeystore {
            service,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Keystore scoped to `RIGHTVAULT_KEYRING_SERVICE`, defaulting to
    /// `"rightvault"`.
    pub fn from_env() -> Result<Self, StoreError> {
        let service = env::var(ENV_SERVICE).unwrap_or_else(|_| DEFAULT_SERVICE.to_string());
        Self::new(service)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry_for(&self, identifier: &Identifier) -> Result<Arc<Entry>, StoreError> {
        if let Some(entry) = self.entries.read().get(identifier) {
            return Ok(entry.clone());
        }
        let entry = Entry::new(&self.service, identifier.as_str())
            .map_err(|err| map_keyring_error(identifier, err))?;
        let entry = Arc::new(entry);
        let mut entries = self.entries.write();
        Ok(entries.entry(identifier.clone()).or_insert(entry).clone())
    }
}

fn map_keyring_error(identifier: &Identifier, error: keyring::Error) -> StoreError {
    match error {
        keyring::Error::NoEntry => StoreError::NotFound {
            identifier: identifier.to_string(),
        },
        keyring::Error::NoStorageAccess(err) => {
            warn!(identifier = %identifier, error = %err, "platform store refused access");
            StoreError::AccessDenied {
                identifier: identifier.to_string(),
            }
        }
        keyring::Error::BadEncoding(_) => StoreError::CorruptRecord {
            identifier: identifier.to_string(),
            detail: "stored blob is not valid UTF-8".into(),
        },
        other => StoreError::Storage(other.to_string()),
    }
}

impl Keystore for KeyringKeystore {
    fn put(&self, record: SecretRecord) -> Result<(), StoreError> {
        let identifier = record.identifier().clone();
        let entry = self.entry_for(&identifier)?;
        let encoded =
            serde_json::to_string(&record).map_err(|err| StoreError::Storage(err.to_string()))?;
        entry
            .set_password(&encoded)
            .map_err(|err| map_keyring_error(&identifier, err))?;
        debug!(identifier = %identifier, service = %self.service, "record stored in platform keystore");
        Ok(())
    }

    fn get(&self, identifier: &Identifier) -> Result<SecretRecord, StoreError> {
        let entry = self.entry_for(identifier)?;
        let raw = entry
            .get_password()
            .map_err(|err| map_keyring_error(identifier, err))?;
        let record: SecretRecord = serde_json::from_str(&raw).map_err(|err| {
            warn!(identifier = %identifier, error = %err, "stored record failed to decode");
            StoreError::CorruptRecord {
                identifier: identifier.to_string(),
                detail: err.to_string(),
            }
        })?;
        if record.identifier() != identifier {
            return Err(StoreError::CorruptRecord {
                identifier: identifier.to_string(),
                detail: format!("record belongs to '{}', not this slot", record.identifier()),
            });
        }
        Ok(record)
    }

    fn delete(&self, identifier: &Identifier) -> Result<(), StoreError> {
        let entry = self.entry_for(identifier)?;
        entry
            .delete_password()
            .map_err(|err| map_keyring_error(identifier, err))?;
        self.entries.write().remove(identifier);
        debug!(identifier = %identifier, service = %self.service, "record deleted from platform keystore");
        Ok(())
    }

    fn exists(&self, identifier: &Identifier) -> Result<bool, StoreError> {
        let entry = self.entry_for(identifier)?;
        match entry.get_password() {
            Ok(_) => Ok(true),
            // A present-but-undecodable blob still exists.
            Err(keyring::Error::BadEncoding(_)) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(map_keyring_error(identifier, err)),
        }
    }
}
