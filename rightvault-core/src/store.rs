//! Keyed registry binding secrets to their authorization requirements.

use std::sync::Arc;

use tracing::{debug, info};

use crate::authenticator::Authenticator;
use crate::errors::StoreError;
use crate::keystore::Keystore;
use crate::requirement::Requirement;
use crate::right::{PersistedRight, Right};
use crate::types::{Identifier, SecretBytes, SecretRecord};

/// Process-wide keyed secret registry over a [`Keystore`].
///
/// The store manages identifiers and binds requirement metadata to payloads.
/// Durability and at-rest protection belong to the keystore; proof of
/// identity belongs to the rights the store hands out. Operations on
/// different identifiers are independent and may interleave freely.
#[derive(Clone)]
pub struct SecretStore {
    keystore: Arc<dyn Keystore>,
    authenticator: Arc<dyn Authenticator>,
}

impl SecretStore {
    pub fn new(keystore: Arc<dyn Keystore>, authenticator: Arc<dyn Authenticator>) -> Self {
        SecretStore {
            keystore,
            authenticator,
        }
    }

    /// Write or overwrite the record under `identifier`, tagged with the
    /// requirement that unlocks it.
    ///
    /// Last write wins: an existing record is replaced whole and its previous
    /// payload discarded.
    pub fn save(
        &self,
        identifier: &Identifier,
        payload: SecretBytes,
        requirement: Requirement,
    ) -> Result<(), StoreError> {
        let record = SecretRecord::new(identifier.clone(), payload, requirement);
        self.keystore.put(record)?;
        info!(identifier = %identifier, requirement = %requirement, "secret saved");
        Ok(())
    }

    /// Build a fresh [`PersistedRight`] for the record under `identifier`,
    /// failing with [`StoreError::NotFound`] when no record exists.
    ///
    /// The right starts in the `Unknown` state, bound to the record's stored
    /// requirement; it must authorize before its secret is released.
    pub fn right_for(&self, identifier: &Identifier) -> Result<PersistedRight, StoreError> {
        let record = self.keystore.get(identifier)?;
        let requirement = record.requirement();
        debug!(identifier = %identifier, requirement = %requirement, "right constructed for stored record");
        let right = Right::new(requirement, self.authenticator.clone());
        Ok(PersistedRight::new(right, record.into_payload()))
    }

    /// Delete the record under `identifier`, failing with
    /// [`StoreError::NotFound`] when no record exists.
    ///
    /// Unconditional: gating a removal behind authorization is the caller's
    /// concern, exactly as for save and fetch.
    pub fn remove(&self, identifier: &Identifier) -> Result<(), StoreError> {
        self.keystore.delete(identifier)?;
        info!(identifier = %identifier, "secret removed");
        Ok(())
    }

    /// Whether a record is currently stored under `identifier`.
    pub fn exists(&self, identifier: &Identifier) -> Result<bool, StoreError> {
        self.keystore.exists(identifier)
    }
}
