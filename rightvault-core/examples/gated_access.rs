//! Walkthrough: login, store, fetch, logout against an in-memory keystore.
//!
//! Run with `RUST_LOG=debug cargo run -p rightvault-core --example gated_access`.

use std::sync::Arc;

use async_trait::async_trait;
use rightvault_core::{
    AccessManager, AuthError, Authenticator, MemoryKeystore, Requirement, VaultError,
};
use tracing_subscriber::EnvFilter;

/// Stand-in for the platform authenticator: approves every prompt.
struct AlwaysApprove;

#[async_trait]
impl Authenticator for AlwaysApprove {
    async fn evaluate(&self, requirement: Requirement, reason: &str) -> Result<(), AuthError> {
        println!("[prompt] {reason} ({requirement})");
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), VaultError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let manager = AccessManager::builder()
        .keystore(Arc::new(MemoryKeystore::new()))
        .authenticator(Arc::new(AlwaysApprove))
        .build()?;

    let mut state = manager.subscribe();

    manager.login().await?;
    println!("state after login: {}", manager.current_state());

    manager.store_text("hello").await?;
    println!("stored under '{}'", manager.identifier());

    let secret = manager.fetch_text().await?;
    println!("fetched: {secret}");

    manager.remove_secret()?;
    manager.logout();

    state.changed().await.ok();
    println!("state after logout: {}", *state.borrow());
    Ok(())
}
