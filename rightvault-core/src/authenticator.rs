//! Contract for the external authentication service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AuthError;
use crate::requirement::Requirement;

/// Bridge to the platform's local-authentication facility.
///
/// `evaluate` presents the proof described by `requirement` to the user, with
/// `reason` as the human-readable prompt text, and resolves once the
/// interaction completes. The wait is unbounded (the user may leave the
/// prompt open); cancellation resolves with [`AuthError::UserCancelled`]
/// rather than hanging. Implementations never retry on their own, and any
/// timeout is theirs to impose.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn evaluate(&self, requirement: Requirement, reason: &str) -> Result<(), AuthError>;
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn evaluate(&self, requirement: Requirement, reason: &str) -> Result<(), AuthError> {
        (**self).evaluate(requirement, reason).await
    }
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Box<T> {
    async fn evaluate(&self, requirement: Requirement, reason: &str) -> Result<(), AuthError> {
        (**self).evaluate(requirement, reason).await
    }
}
