//! Authorization-gated secret storage.
//!
//! A secret is persisted, retrieved, or removed only behind an authorization
//! check. The check is embodied by a [`Right`]: a capability token carrying an
//! immutable [`Requirement`] and a small state machine. Secrets live in an
//! external protected keystore behind the [`Keystore`] trait; proof of
//! identity comes from the platform behind the [`Authenticator`] trait. The
//! [`AccessManager`] ties both together: one shared login right gating a whole
//! section, fresh per-operation rights gating each save and fetch, and a
//! watch-published view of the settled login state.
//!
//! Nothing here talks to biometric hardware or implements cryptography; both
//! collaborators arrive as trait objects and can be faked in tests.

pub mod access;
pub mod authenticator;
pub mod errors;
pub mod keystore;
pub mod requirement;
pub mod right;
pub mod store;
pub mod types;

pub use access::{AccessBuilder, AccessManager, DEFAULT_IDENTIFIER, VaultError};
pub use authenticator::Authenticator;
pub use errors::{AccessError, AuthError, StoreError};
pub use keystore::{Keystore, MemoryKeystore};
pub use requirement::{Fallback, Requirement};
pub use right::{AuthState, PersistedRight, Right};
pub use store::SecretStore;
pub use types::{Identifier, MAX_IDENTIFIER_LEN, SecretBytes, SecretRecord};
