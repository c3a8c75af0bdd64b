//! The access manager: one shared login right plus per-operation rights over
//! a fixed identifier.

use std::env;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::authenticator::Authenticator;
use crate::errors::{AccessError, AuthError, StoreError};
use crate::keystore::Keystore;
use crate::requirement::Requirement;
use crate::right::{AuthState, Right};
use crate::store::SecretStore;
use crate::types::{Identifier, SecretBytes};

/// Identifier used when none is configured.
pub const DEFAULT_IDENTIFIER: &str = "secretText";

const DEFAULT_LOGIN_REASON: &str = "Authenticate to access your secure data";
const DEFAULT_STORE_REASON: &str = "Authenticate to save your data securely";
const DEFAULT_FETCH_REASON: &str = "Authenticate to access your secure data";

const ENV_IDENTIFIER: &str = "RIGHTVAULT_IDENTIFIER";
const ENV_LOGIN_REASON: &str = "RIGHTVAULT_LOGIN_REASON";
const ENV_STORE_REASON: &str = "RIGHTVAULT_STORE_REASON";
const ENV_FETCH_REASON: &str = "RIGHTVAULT_FETCH_REASON";

/// Failures surfaced by [`AccessManager`] operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("secret payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Builder for [`AccessManager`].
///
/// The keystore and authenticator are always injected explicitly; the
/// identifier, prompt reasons, and requirements have defaults and may also be
/// seeded from the environment via [`AccessBuilder::from_env`].
#[derive(Default)]
pub struct AccessBuilder {
    identifier: Option<String>,
    login_reason: Option<String>,
    store_reason: Option<String>,
    fetch_reason: Option<String>,
    login_requirement: Option<Requirement>,
    secret_requirement: Option<Requirement>,
    keystore: Option<Arc<dyn Keystore>>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl AccessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded from `RIGHTVAULT_IDENTIFIER`, `RIGHTVAULT_LOGIN_REASON`,
    /// `RIGHTVAULT_STORE_REASON`, and `RIGHTVAULT_FETCH_REASON`. Unset
    /// variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        builder.identifier = env::var(ENV_IDENTIFIER).ok();
        builder.login_reason = env::var(ENV_LOGIN_REASON).ok();
        builder.store_reason = env::var(ENV_STORE_REASON).ok();
        builder.fetch_reason = env::var(ENV_FETCH_REASON).ok();
        builder
    }

    /// Identifier all manager operations act on. Defaults to
    /// [`DEFAULT_IDENTIFIER`].
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Prompt text shown by `login`.
    pub fn login_reason(mut self, reason: impl Into<String>) -> Self {
        self.login_reason = Some(reason.into());
        self
    }

    /// Prompt text shown when storing a secret.
    pub fn store_reason(mut self, reason: impl Into<String>) -> Self {
        self.store_reason = Some(reason.into());
        self
    }

    /// Prompt text shown when fetching the secret.
    pub fn fetch_reason(mut self, reason: impl Into<String>) -> Self {
        self.fetch_reason = Some(reason.into());
        self
    }

    /// Requirement proven by `login`. Defaults to biometry with
    /// device-passcode fallback.
    pub fn login_requirement(mut self, requirement: Requirement) -> Self {
        self.login_requirement = Some(requirement);
        self
    }

    /// Requirement bound to newly stored secrets. Defaults to biometry with
    /// device-passcode fallback.
    pub fn secret_requirement(mut self, requirement: Requirement) -> Self {
        self.secret_requirement = Some(requirement);
        self
    }

    pub fn keystore(mut self, keystore: Arc<dyn Keystore>) -> Self {
        self.keystore = Some(keystore);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn build(self) -> Result<AccessManager, VaultError> {
        let keystore = self
            .keystore
            .ok_or_else(|| VaultError::Config("no keystore configured".into()))?;
        let authenticator = self
            .authenticator
            .ok_or_else(|| VaultError::Config("no authenticator configured".into()))?;
        let identifier = Identifier::new(
            self.identifier
                .unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string()),
        )
        .map_err(|err| VaultError::Config(err.to_string()))?;

        let login_requirement = self
            .login_requirement
            .unwrap_or_else(Requirement::biometry_or_passcode);
        let secret_requirement = self
            .secret_requirement
            .unwrap_or_else(Requirement::biometry_or_passcode);
        let login_right = Right::new(login_requirement, authenticator.clone());
        let (state_tx, _) = watch::channel(AuthState::Unknown);

        Ok(AccessManager {
            store: SecretStore::new(keystore, authenticator.clone()),
            authenticator,
            identifier,
            login_right,
            login_reason: self
                .login_reason
                .unwrap_or_else(|| DEFAULT_LOGIN_REASON.to_string()),
            store_reason: self
                .store_reason
                .unwrap_or_else(|| DEFAULT_STORE_REASON.to_string()),
            fetch_reason: self
                .fetch_reason
                .unwrap_or_else(|| DEFAULT_FETCH_REASON.to_string()),
            secret_requirement,
            state_tx,
        })
    }
}

/// Orchestrates the shared login right and per-operation rights over one
/// configured identifier.
///
/// Construct once at process start and share from there (typically in an
/// `Arc`); there is no implicit global instance. The shared right is mutated
/// only by [`AccessManager::login`] and [`AccessManager::logout`]; its
/// published state may be read freely and carries settled values only, so
/// observers never see `Authorizing`.
pub struct AccessManager {
    store: SecretStore,
    authenticator: Arc<dyn Authenticator>,
    identifier: Identifier,
    login_right: Right,
    login_reason: String,
    store_reason: String,
    fetch_reason: String,
    secret_requirement: Requirement,
    state_tx: watch::Sender<AuthState>,
}

impl AccessManager {
    pub fn builder() -> AccessBuilder {
        AccessBuilder::new()
    }

    /// Identifier all manager operations act on.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The underlying keyed store, for callers working outside the fixed
    /// identifier.
    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    /// Latest published (settled) state of the shared login right.
    pub fn current_state(&self) -> AuthState {
        *self.state_tx.borrow()
    }

    /// Watch the published login state.
    ///
    /// The receiver holds the current value and observes every later settled
    /// update in publish order.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Authorize the shared login right and publish the outcome.
    ///
    /// A concurrent second login fails with
    /// [`AuthError::AlreadyInProgress`] and publishes nothing; the in-flight
    /// call's settle is the next published value.
    pub async fn login(&self) -> Result<(), VaultError> {
        let outcome = self.login_right.authorize(&self.login_reason).await;
        match &outcome {
            Ok(()) => {
                self.state_tx.send_replace(AuthState::Authorized);
                info!(state = %AuthState::Authorized, "login settled");
            }
            Err(AuthError::AlreadyInProgress) => {}
            Err(error) => {
                self.state_tx.send_replace(AuthState::NotAuthorized);
                info!(state = %AuthState::NotAuthorized, error = %error, "login settled");
            }
        }
        outcome.map_err(VaultError::from)
    }

    /// Deauthorize the shared login right and publish `NotAuthorized`.
    /// Idempotent; never prompts.
    pub fn logout(&self) {
        self.login_right.deauthorize();
        self.state_tx.send_replace(AuthState::NotAuthorized);
        info!(state = %AuthState::NotAuthorized, "logout settled");
    }

    /// Store `payload` under the configured identifier behind a fresh
    /// authorization.
    pub async fn store_secret(&self, payload: SecretBytes) -> Result<(), VaultError> {
        let right = Right::new(self.secret_requirement, self.authenticator.clone());
        right.authorize(&self.store_reason).await?;
        self.store
            .save(&self.identifier, payload, self.secret_requirement)?;
        Ok(())
    }

    /// Fetch the secret under the configured identifier behind the
    /// requirement stored with it.
    pub async fn fetch_secret(&self) -> Result<SecretBytes, VaultError> {
        let right = self.store.right_for(&self.identifier)?;
        right.authorize(&self.fetch_reason).await?;
        Ok(right.secret()?)
    }

    /// Remove the secret under the configured identifier.
    ///
    /// Not gated here: the caller is expected to have authorized the removal
    /// in the same interaction, e.g. through a prior successful fetch.
    pub fn remove_secret(&self) -> Result<(), VaultError> {
        self.store.remove(&self.identifier)?;
        Ok(())
    }

    /// Whether a secret is stored under the configured identifier. Never
    /// prompts.
    pub fn exists(&self) -> Result<bool, VaultError> {
        Ok(self.store.exists(&self.identifier)?)
    }

    /// Store a UTF-8 string; same gate as [`AccessManager::store_secret`].
    pub async fn store_text(&self, text: &str) -> Result<(), VaultError> {
        self.store_secret(SecretBytes::from(text)).await
    }

    /// Fetch the secret as UTF-8 text.
    pub async fn fetch_text(&self) -> Result<String, VaultError> {
        let secret = self.fetch_secret().await?;
        Ok(String::from_utf8(secret.into_bytes())?)
    }

    /// Store a serializable value as JSON; same gate as
    /// [`AccessManager::store_secret`].
    pub async fn store_json<T: Serialize>(&self, value: &T) -> Result<(), VaultError> {
        let payload = serde_json::to_vec(value)?;
        self.store_secret(SecretBytes::new(payload)).await
    }

    /// Fetch and deserialize the secret as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self) -> Result<T, VaultError> {
        let secret = self.fetch_secret().await?;
        Ok(serde_json::from_slice(secret.expose())?)
    }
}
