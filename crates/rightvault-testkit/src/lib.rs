//! Test tooling for rightvault.
//!
//! Two halves: authenticator fakes ([`ScriptedAuthenticator`],
//! [`GatedAuthenticator`]) standing in for the platform prompt, and
//! [`KeystoreConformance`], the behavioral checks every keystore
//! implementation must pass. Neither touches real hardware; both are safe in
//! hermetic test runs.

pub mod authn;
pub mod fixtures;
pub mod suite;

pub use authn::{GatedAuthenticator, ScriptedAuthenticator};
pub use fixtures::{random_payload, unique_identifier};
pub use suite::KeystoreConformance;
