//! Error taxonomy for authorization, storage, and the local secret guard.

use thiserror::Error;

/// Failures reported by the external authentication service, plus the
/// in-process mutual-exclusion violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The user dismissed the authentication prompt.
    #[error("authentication was cancelled by the user")]
    UserCancelled,
    #[error("biometry is not available on this device")]
    BiometryUnavailable,
    #[error("biometry is locked out after repeated failed attempts")]
    BiometryLockedOut,
    #[error("no device passcode is set")]
    PasscodeNotSet,
    /// A second `authorize` was issued while one was already in flight.
    #[error("an authorization attempt is already in progress")]
    AlreadyInProgress,
    #[error("authentication service failure (code {code})")]
    System { code: i32 },
}

/// Failures reported by the secret store and its persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no secret stored under '{identifier}'")]
    NotFound { identifier: String },
    /// The persistence service refused access to the record.
    #[error("access to stored secret '{identifier}' was denied")]
    AccessDenied { identifier: String },
    /// The persisted record could not be decoded. Never recovered silently.
    #[error("stored record '{identifier}' is corrupt: {detail}")]
    CorruptRecord { identifier: String, detail: String },
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },
    /// Persistence-layer system error, surfaced unchanged.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Failure of the local secret guard on a right.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The secret was requested while the right is not `Authorized`.
    #[error("right is not authorized")]
    NotAuthorized,
}
