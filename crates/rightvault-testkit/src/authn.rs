//! Authenticator fakes: scripted outcomes and gated in-flight control.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rightvault_core::{AuthError, Authenticator, Requirement};
use tokio::sync::Semaphore;

/// Authenticator replaying a queue of outcomes.
///
/// An exhausted queue falls back to the configured default (approval, unless
/// built with [`ScriptedAuthenticator::refusing`]). Every evaluation is
/// counted and its prompt reason recorded.
pub struct ScriptedAuthenticator {
    script: Mutex<VecDeque<Result<(), AuthError>>>,
    fallback: Result<(), AuthError>,
    reasons: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedAuthenticator {
    /// Approves everything.
    pub fn approving() -> Self {
        Self::with_fallback(Ok(()))
    }

    /// Refuses everything with `error`.
    pub fn refusing(error: AuthError) -> Self {
        Self::with_fallback(Err(error))
    }

    /// Replays `outcomes` in order, then approves.
    pub fn scripted(outcomes: impl IntoIterator<Item = Result<(), AuthError>>) -> Self {
        let authenticator = Self::with_fallback(Ok(()));
        *authenticator.script.lock() = outcomes.into_iter().collect();
        authenticator
    }

    fn with_fallback(fallback: Result<(), AuthError>) -> Self {
        ScriptedAuthenticator {
            script: Mutex::new(VecDeque::new()),
            fallback,
            reasons: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue one more outcome.
    pub fn push(&self, outcome: Result<(), AuthError>) {
        self.script.lock().push_back(outcome);
    }

    /// Number of evaluations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompt reasons seen, in order.
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().clone()
    }
}

#[async_trait]
impl Authenticator for ScriptedAuthenticator {
    async fn evaluate(&self, _requirement: Requirement, reason: &str) -> Result<(), AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reasons.lock().push(reason.to_string());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Authenticator that holds every evaluation until released.
///
/// Keeps an authorize in flight deterministically, e.g. to observe
/// [`AuthError::AlreadyInProgress`] without racing the service.
pub struct GatedAuthenticator {
    permits: Semaphore,
    outcome: Mutex<Result<(), AuthError>>,
    calls: AtomicUsize,
}

impl GatedAuthenticator {
    pub fn new() -> Self {
        GatedAuthenticator {
            permits: Semaphore::new(0),
            outcome: Mutex::new(Ok(())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Outcome a released evaluation resolves with. Defaults to approval.
    pub fn set_outcome(&self, outcome: Result<(), AuthError>) {
        *self.outcome.lock() = outcome;
    }

    /// Let one held evaluation resolve.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    /// Number of evaluations started, held ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Yield until `count` evaluations have started.
    pub async fn wait_for_calls(&self, count: usize) {
        while self.calls() < count {
            tokio::task::yield_now().await;
        }
    }
}

impl Default for GatedAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for GatedAuthenticator {
    async fn evaluate(&self, _requirement: Requirement, _reason: &str) -> Result<(), AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AuthError::System { code: -1 })?;
        permit.forget();
        self.outcome.lock().clone()
    }
}
