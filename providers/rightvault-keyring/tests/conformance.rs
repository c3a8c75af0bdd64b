#![cfg(feature = "integration")]

//! Conformance against the real platform credential store.
//!
//! Touches the OS keystore, so it is opt-in twice over: the `integration`
//! feature and `RIGHTVAULT_INTEGRATION=1`.

use rightvault_keyring::KeyringKeystore;
use rightvault_testkit::KeystoreConformance;

fn integration_enabled() -> bool {
    std::env::var("RIGHTVAULT_INTEGRATION")
        .map(|value| value == "1")
        .unwrap_or(false)
}

#[test]
#[ignore = "touches the OS keystore; run with RIGHTVAULT_INTEGRATION=1"]
fn platform_store_passes_conformance() -> anyhow::Result<()> {
    if !integration_enabled() {
        eprintln!("skipping: RIGHTVAULT_INTEGRATION is not set to 1");
        return Ok(());
    }
    let store = KeyringKeystore::new("rightvault-conformance")?;
    KeystoreConformance::new(&store).run_all()
}
