//! Conformance checks every keystore implementation must pass.

use anyhow::{Context, ensure};
use rightvault_core::{Keystore, Requirement, SecretRecord, StoreError};

use crate::fixtures::{random_payload, unique_identifier};

/// Behavioral checks for a [`Keystore`] implementation.
///
/// Every check uses fresh randomized identifiers and removes what it stores,
/// so the suite can run repeatedly against a shared durable store without
/// colliding with existing entries.
pub struct KeystoreConformance<'a, K: Keystore> {
    store: &'a K,
}

impl<'a, K: Keystore> KeystoreConformance<'a, K> {
    pub fn new(store: &'a K) -> Self {
        KeystoreConformance { store }
    }

    /// Run every check, naming the failing one on error.
    pub fn run_all(&self) -> anyhow::Result<()> {
        self.round_trip().context("round_trip")?;
        self.overwrite_is_last_write_wins()
            .context("overwrite_is_last_write_wins")?;
        self.delete_removes_the_record()
            .context("delete_removes_the_record")?;
        self.missing_records_report_not_found()
            .context("missing_records_report_not_found")?;
        self.exists_tracks_lifecycle()
            .context("exists_tracks_lifecycle")?;
        self.independent_identifiers_are_isolated()
            .context("independent_identifiers_are_isolated")?;
        Ok(())
    }

    pub fn round_trip(&self) -> anyhow::Result<()> {
        let id = unique_identifier("conf-roundtrip");
        let payload = random_payload(64);
        self.store.put(SecretRecord::new(
            id.clone(),
            payload.clone(),
            Requirement::biometry_or_passcode(),
        ))?;

        let loaded = self.store.get(&id).context("get after put")?;
        ensure!(
            loaded.payload() == &payload,
            "loaded payload differs from stored payload"
        );
        ensure!(
            loaded.requirement() == Requirement::biometry_or_passcode(),
            "loaded requirement differs from stored requirement"
        );
        ensure!(loaded.identifier() == &id, "loaded identifier differs");

        self.store.delete(&id)?;
        Ok(())
    }

    pub fn overwrite_is_last_write_wins(&self) -> anyhow::Result<()> {
        let id = unique_identifier("conf-overwrite");
        let first = random_payload(32);
        let second = random_payload(32);
        self.store.put(SecretRecord::new(
            id.clone(),
            first,
            Requirement::biometry_or_passcode(),
        ))?;
        self.store.put(SecretRecord::new(
            id.clone(),
            second.clone(),
            Requirement::biometry(),
        ))?;

        let loaded = self.store.get(&id).context("get after overwrite")?;
        ensure!(
            loaded.payload() == &second,
            "overwrite must replace the payload"
        );
        ensure!(
            loaded.requirement() == Requirement::biometry(),
            "overwrite must replace the requirement"
        );

        self.store.delete(&id)?;
        Ok(())
    }

    pub fn delete_removes_the_record(&self) -> anyhow::Result<()> {
        let id = unique_identifier("conf-delete");
        self.store.put(SecretRecord::new(
            id.clone(),
            random_payload(16),
            Requirement::biometry(),
        ))?;
        self.store.delete(&id).context("delete existing record")?;
        ensure!(
            matches!(self.store.get(&id), Err(StoreError::NotFound { .. })),
            "get after delete must report NotFound"
        );
        Ok(())
    }

    pub fn missing_records_report_not_found(&self) -> anyhow::Result<()> {
        let id = unique_identifier("conf-missing");
        ensure!(
            matches!(self.store.get(&id), Err(StoreError::NotFound { .. })),
            "get of a never-stored identifier must report NotFound"
        );
        ensure!(
            matches!(self.store.delete(&id), Err(StoreError::NotFound { .. })),
            "delete of a never-stored identifier must report NotFound"
        );
        Ok(())
    }

    pub fn exists_tracks_lifecycle(&self) -> anyhow::Result<()> {
        let id = unique_identifier("conf-exists");
        ensure!(!self.store.exists(&id)?, "exists must be false before put");
        self.store.put(SecretRecord::new(
            id.clone(),
            random_payload(16),
            Requirement::biometry(),
        ))?;
        ensure!(self.store.exists(&id)?, "exists must be true after put");
        self.store.delete(&id)?;
        ensure!(!self.store.exists(&id)?, "exists must be false after delete");
        Ok(())
    }

    pub fn independent_identifiers_are_isolated(&self) -> anyhow::Result<()> {
        let left = unique_identifier("conf-iso-left");
        let right = unique_identifier("conf-iso-right");
        let left_payload = random_payload(24);
        let right_payload = random_payload(24);

        std::thread::scope(|scope| -> anyhow::Result<()> {
            let left_writer = scope.spawn(|| {
                self.store.put(SecretRecord::new(
                    left.clone(),
                    left_payload.clone(),
                    Requirement::biometry(),
                ))
            });
            let right_writer = scope.spawn(|| {
                self.store.put(SecretRecord::new(
                    right.clone(),
                    right_payload.clone(),
                    Requirement::biometry(),
                ))
            });
            left_writer.join().expect("left writer panicked")?;
            right_writer.join().expect("right writer panicked")?;
            Ok(())
        })?;

        let loaded_left = self.store.get(&left).context("get left after concurrent puts")?;
        let loaded_right = self
            .store
            .get(&right)
            .context("get right after concurrent puts")?;
        ensure!(
            loaded_left.payload() == &left_payload,
            "concurrent writer corrupted an independent record"
        );
        ensure!(
            loaded_right.payload() == &right_payload,
            "concurrent writer corrupted an independent record"
        );

        self.store.delete(&left)?;
        self.store.delete(&right)?;
        Ok(())
    }
}
