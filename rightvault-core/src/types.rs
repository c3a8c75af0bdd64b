//! Core value types: identifiers, secret payloads, and stored records.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::StoreError;
use crate::requirement::Requirement;

/// Longest accepted identifier, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Stable key under which a secret is stored and later retrieved or removed.
///
/// Valid identifiers are non-empty, at most [`MAX_IDENTIFIER_LEN`] bytes, and
/// drawn from `[A-Za-z0-9._-]`. Validation runs at construction and again on
/// deserialization, so a held `Identifier` is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into();
        validate_identifier(&value)?;
        Ok(Identifier(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identifier::new(value)
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> String {
        identifier.0
    }
}

fn validate_identifier(value: &str) -> Result<(), StoreError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.len() > MAX_IDENTIFIER_LEN {
        Some("longer than 128 bytes")
    } else if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        Some("contains characters outside [A-Za-z0-9._-]")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidIdentifier {
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Opaque secret payload.
///
/// The buffer zeroizes on drop and redacts itself from `Debug` output; raw
/// bytes are reached only through [`SecretBytes::expose`] or
/// [`SecretBytes::into_bytes`]. Serializes as a standard-alphabet base64
/// string.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        SecretBytes(bytes.into())
    }

    /// Borrow the raw bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Take the raw bytes out, giving up zeroize-on-drop for them.
    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([REDACTED {} bytes])", self.0.len())
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(bytes: Vec<u8>) -> Self {
        SecretBytes(bytes)
    }
}

impl From<&[u8]> for SecretBytes {
    fn from(bytes: &[u8]) -> Self {
        SecretBytes(bytes.to_vec())
    }
}

impl From<&str> for SecretBytes {
    fn from(text: &str) -> Self {
        SecretBytes(text.as_bytes().to_vec())
    }
}

impl From<String> for SecretBytes {
    fn from(text: String) -> Self {
        SecretBytes(text.into_bytes())
    }
}

impl Serialize for SecretBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for SecretBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)?;
        Ok(SecretBytes(bytes))
    }
}

/// A stored secret: payload plus the requirement that unlocks it.
///
/// Records exist for an identifier exactly between `save` and `remove`;
/// identifiers are unique within a keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    identifier: Identifier,
    payload: SecretBytes,
    requirement: Requirement,
}

impl SecretRecord {
    pub fn new(identifier: Identifier, payload: SecretBytes, requirement: Requirement) -> Self {
        SecretRecord {
            identifier,
            payload,
            requirement,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn payload(&self) -> &SecretBytes {
        &self.payload
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    pub fn into_payload(self) -> SecretBytes {
        self.payload
    }
}
