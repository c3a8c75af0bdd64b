//! Payload and identifier fixtures.

use rand::RngCore;
use rightvault_core::{Identifier, SecretBytes};

/// Random payload of `len` bytes.
pub fn random_payload(len: usize) -> SecretBytes {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    SecretBytes::new(bytes)
}

/// Identifier of the form `prefix-xxxxxxxx`, unique enough that repeated
/// suite runs against a shared durable store do not collide.
pub fn unique_identifier(prefix: &str) -> Identifier {
    let suffix: u32 = rand::rng().next_u32();
    Identifier::new(format!("{prefix}-{suffix:08x}"))
        .expect("fixture prefix must satisfy identifier rules")
}
