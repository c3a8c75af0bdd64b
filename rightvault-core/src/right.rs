//! Rights: capability tokens pairing an authorization requirement with a
//! state machine.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::authenticator::Authenticator;
use crate::errors::{AccessError, AuthError};
use crate::requirement::Requirement;
use crate::types::SecretBytes;

/// Authorization state of a [`Right`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Freshly constructed; no attempt made yet.
    Unknown,
    /// An `authorize` call is awaiting the authentication service. Transient;
    /// only ever observed while a call is in flight.
    Authorizing,
    Authorized,
    NotAuthorized,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthState::Unknown => "unknown",
            AuthState::Authorizing => "authorizing",
            AuthState::Authorized => "authorized",
            AuthState::NotAuthorized => "not_authorized",
        };
        f.write_str(label)
    }
}

/// Capability token bound to one requirement.
///
/// The state is owned exclusively by the right and changes only through
/// [`Right::authorize`] and [`Right::deauthorize`]. A single right excludes
/// concurrent authorize attempts ([`AuthError::AlreadyInProgress`]);
/// independent rights share nothing and authorize fully concurrently.
pub struct Right {
    requirement: Requirement,
    authenticator: Arc<dyn Authenticator>,
    inner: Mutex<RightState>,
}

struct RightState {
    state: AuthState,
    // Set for the whole of an authorize call. A mid-flight deauthorize
    // resets `state` but must not re-admit a second authorize.
    in_flight: bool,
}

impl Right {
    /// New right in state [`AuthState::Unknown`].
    pub fn new(requirement: Requirement, authenticator: Arc<dyn Authenticator>) -> Self {
        Right {
            requirement,
            authenticator,
            inner: Mutex::new(RightState {
                state: AuthState::Unknown,
                in_flight: false,
            }),
        }
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    pub fn state(&self) -> AuthState {
        self.inner.lock().state
    }

    /// Prove the requirement through the authentication service.
    ///
    /// Suspends until the user interaction resolves; the wait is unbounded.
    /// Fails fast with [`AuthError::AlreadyInProgress`] while another call is
    /// in flight, without consulting the service again. From `Authorized`
    /// this is a no-op success; a caller that wants fresh proof deauthorizes
    /// first. Every service failure, including [`AuthError::UserCancelled`],
    /// settles the state to `NotAuthorized` rather than leaving it in
    /// `Authorizing`.
    pub async fn authorize(&self, reason: &str) -> Result<(), AuthError> {
        {
            let mut inner = self.inner.lock();
            if inner.in_flight {
                return Err(AuthError::AlreadyInProgress);
            }
            if inner.state == AuthState::Authorized {
                return Ok(());
            }
            inner.state = AuthState::Authorizing;
            inner.in_flight = true;
        }

        // An abandoned in-flight authorize must not wedge the right in
        // `Authorizing`.
        let guard = SettleOnDrop { inner: &self.inner };
        let outcome = self.authenticator.evaluate(self.requirement, reason).await;
        guard.settle(&outcome);
        outcome
    }

    /// Revoke authorization. Always succeeds; idempotent.
    ///
    /// A deauthorize that lands while an authorize is in flight is superseded
    /// when that authorize settles, and does not lift that call's exclusion
    /// of further authorize attempts.
    pub fn deauthorize(&self) {
        let mut inner = self.inner.lock();
        if inner.state != AuthState::NotAuthorized {
            debug!(requirement = %self.requirement, "right deauthorized");
        }
        inner.state = AuthState::NotAuthorized;
    }
}

impl fmt::Debug for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Right")
            .field("requirement", &self.requirement)
            .field("state", &self.state())
            .finish()
    }
}

struct SettleOnDrop<'a> {
    inner: &'a Mutex<RightState>,
}

impl SettleOnDrop<'_> {
    fn settle(self, outcome: &Result<(), AuthError>) {
        let next = match outcome {
            Ok(()) => AuthState::Authorized,
            Err(_) => AuthState::NotAuthorized,
        };
        {
            let mut inner = self.inner.lock();
            inner.state = next;
            inner.in_flight = false;
        }
        match outcome {
            Ok(()) => debug!(state = %next, "authorization granted"),
            Err(error) => debug!(state = %next, error = %error, "authorization failed"),
        }
        std::mem::forget(self);
    }
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        {
            let mut inner = self.inner.lock();
            inner.state = AuthState::NotAuthorized;
            inner.in_flight = false;
        }
        debug!("in-flight authorization dropped");
    }
}

/// A right constructed from a stored record, carrying that record's payload.
///
/// The payload is captured when the right is built; [`PersistedRight::secret`]
/// is a pure local guard over it and never consults storage again.
pub struct PersistedRight {
    right: Right,
    payload: SecretBytes,
}

impl PersistedRight {
    pub(crate) fn new(right: Right, payload: SecretBytes) -> Self {
        PersistedRight { right, payload }
    }

    pub fn requirement(&self) -> Requirement {
        self.right.requirement()
    }

    pub fn state(&self) -> AuthState {
        self.right.state()
    }

    /// See [`Right::authorize`].
    pub async fn authorize(&self, reason: &str) -> Result<(), AuthError> {
        self.right.authorize(reason).await
    }

    /// See [`Right::deauthorize`].
    pub fn deauthorize(&self) {
        self.right.deauthorize()
    }

    /// The protected payload, released only while `Authorized`.
    ///
    /// This is a local guard, not a re-invocation of authorization. Revoking
    /// the right afterwards does not reach bytes already handed out;
    /// downstream copies are the caller's responsibility.
    pub fn secret(&self) -> Result<SecretBytes, AccessError> {
        match self.right.state() {
            AuthState::Authorized => Ok(self.payload.clone()),
            _ => Err(AccessError::NotAuthorized),
        }
    }
}

impl fmt::Debug for PersistedRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedRight")
            .field("requirement", &self.requirement())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;

    struct StaticAuthenticator {
        outcome: Mutex<Result<(), AuthError>>,
        calls: AtomicUsize,
    }

    impl StaticAuthenticator {
        fn approving() -> Self {
            Self::with(Ok(()))
        }

        fn with(outcome: Result<(), AuthError>) -> Self {
            StaticAuthenticator {
                outcome: Mutex::new(outcome),
                calls: AtomicUsize::new(0),
            }
        }

        fn set(&self, outcome: Result<(), AuthError>) {
            *self.outcome.lock() = outcome;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for StaticAuthenticator {
        async fn evaluate(&self, _requirement: Requirement, _reason: &str) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.lock().clone()
        }
    }

    /// Holds every evaluation until released, to keep an authorize in flight.
    struct HeldAuthenticator {
        permits: Semaphore,
        calls: AtomicUsize,
    }

    impl HeldAuthenticator {
        fn new() -> Self {
            HeldAuthenticator {
                permits: Semaphore::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn release(&self) {
            self.permits.add_permits(1);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for HeldAuthenticator {
        async fn evaluate(&self, _requirement: Requirement, _reason: &str) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| AuthError::System { code: -1 })?;
            permit.forget();
            Ok(())
        }
    }

    #[tokio::test]
    async fn authorize_moves_unknown_to_authorized() {
        let authenticator = Arc::new(StaticAuthenticator::approving());
        let right = Right::new(Requirement::biometry_or_passcode(), authenticator.clone());
        assert_eq!(right.state(), AuthState::Unknown);

        right.authorize("unit test").await.unwrap();
        assert_eq!(right.state(), AuthState::Authorized);
        assert_eq!(authenticator.calls(), 1);
    }

    #[tokio::test]
    async fn reauthorize_while_authorized_is_a_noop() {
        let authenticator = Arc::new(StaticAuthenticator::approving());
        let right = Right::new(Requirement::biometry(), authenticator.clone());
        right.authorize("first").await.unwrap();
        right.authorize("second").await.unwrap();
        assert_eq!(authenticator.calls(), 1);
    }

    #[tokio::test]
    async fn failure_settles_to_not_authorized() {
        for error in [
            AuthError::UserCancelled,
            AuthError::BiometryUnavailable,
            AuthError::BiometryLockedOut,
            AuthError::PasscodeNotSet,
            AuthError::System { code: -4 },
        ] {
            let authenticator = Arc::new(StaticAuthenticator::with(Err(error.clone())));
            let right = Right::new(Requirement::biometry(), authenticator);
            assert_eq!(right.authorize("unit test").await, Err(error));
            assert_eq!(right.state(), AuthState::NotAuthorized);
        }
    }

    #[tokio::test]
    async fn retry_after_failure_reaches_the_service_again() {
        let authenticator = Arc::new(StaticAuthenticator::with(Err(AuthError::UserCancelled)));
        let right = Right::new(Requirement::biometry(), authenticator.clone());
        assert!(right.authorize("first").await.is_err());
        assert!(right.authorize("second").await.is_err());
        assert_eq!(authenticator.calls(), 2);
    }

    #[tokio::test]
    async fn deauthorize_is_idempotent() {
        let authenticator = Arc::new(StaticAuthenticator::approving());
        let right = Right::new(Requirement::biometry(), authenticator);
        right.authorize("unit test").await.unwrap();

        right.deauthorize();
        assert_eq!(right.state(), AuthState::NotAuthorized);
        right.deauthorize();
        assert_eq!(right.state(), AuthState::NotAuthorized);
    }

    #[tokio::test]
    async fn concurrent_authorize_is_excluded() {
        let authenticator = Arc::new(HeldAuthenticator::new());
        let right = Arc::new(Right::new(Requirement::biometry(), authenticator.clone()));

        let pending = tokio::spawn({
            let right = right.clone();
            async move { right.authorize("first").await }
        });
        while authenticator.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(right.state(), AuthState::Authorizing);

        assert_eq!(
            right.authorize("second").await,
            Err(AuthError::AlreadyInProgress)
        );
        assert_eq!(authenticator.calls(), 1);

        authenticator.release();
        assert_eq!(pending.await.unwrap(), Ok(()));
        assert_eq!(right.state(), AuthState::Authorized);
    }

    #[tokio::test]
    async fn deauthorize_mid_flight_does_not_lift_the_exclusion() {
        let authenticator = Arc::new(HeldAuthenticator::new());
        let right = Arc::new(Right::new(Requirement::biometry(), authenticator.clone()));

        let pending = tokio::spawn({
            let right = right.clone();
            async move { right.authorize("first").await }
        });
        while authenticator.calls() == 0 {
            tokio::task::yield_now().await;
        }

        right.deauthorize();
        assert_eq!(right.state(), AuthState::NotAuthorized);
        assert_eq!(
            right.authorize("second").await,
            Err(AuthError::AlreadyInProgress)
        );
        assert_eq!(authenticator.calls(), 1);

        // The held call still settles, and its outcome is the later write.
        authenticator.release();
        assert_eq!(pending.await.unwrap(), Ok(()));
        assert_eq!(right.state(), AuthState::Authorized);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_authorize_settles_to_not_authorized() {
        let authenticator = Arc::new(HeldAuthenticator::new());
        let right = Right::new(Requirement::biometry(), authenticator.clone());

        let attempt =
            tokio::time::timeout(Duration::from_millis(5), right.authorize("abandoned")).await;
        assert!(attempt.is_err());
        assert_eq!(right.state(), AuthState::NotAuthorized);

        // The right is usable again: a new attempt reaches the service.
        authenticator.release();
        let retry = tokio::time::timeout(Duration::from_secs(1), right.authorize("retry")).await;
        assert_eq!(retry.unwrap(), Ok(()));
        assert_eq!(authenticator.calls(), 2);
    }

    #[tokio::test]
    async fn secret_is_gated_on_authorized() {
        let authenticator = Arc::new(StaticAuthenticator::approving());
        let right = Right::new(Requirement::biometry_or_passcode(), authenticator);
        let persisted = PersistedRight::new(right, SecretBytes::from("hush"));

        assert_eq!(persisted.secret(), Err(AccessError::NotAuthorized));
        persisted.authorize("unit test").await.unwrap();
        assert_eq!(persisted.secret().unwrap().expose(), b"hush");

        persisted.deauthorize();
        assert_eq!(persisted.secret(), Err(AccessError::NotAuthorized));
    }

    #[tokio::test]
    async fn failed_reauthorize_revokes_the_secret() {
        let authenticator = Arc::new(StaticAuthenticator::approving());
        let right = Right::new(Requirement::biometry(), authenticator.clone());
        let persisted = PersistedRight::new(right, SecretBytes::from("hush"));
        persisted.authorize("first").await.unwrap();
        assert!(persisted.secret().is_ok());

        persisted.deauthorize();
        authenticator.set(Err(AuthError::UserCancelled));
        assert!(persisted.authorize("second").await.is_err());
        assert_eq!(persisted.secret(), Err(AccessError::NotAuthorized));
    }

    #[test]
    fn debug_output_hides_the_payload() {
        let authenticator = Arc::new(StaticAuthenticator::approving());
        let right = Right::new(Requirement::biometry(), authenticator);
        let persisted = PersistedRight::new(right, SecretBytes::from("hush"));
        let rendered = format!("{persisted:?}");
        assert!(!rendered.contains("hush"));
    }
}
