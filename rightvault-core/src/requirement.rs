//! Authorization requirements: what must be proven before access is granted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Knowledge-factor fallback accepted when the primary biometric check cannot
/// complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    DevicePasscode,
}

/// What a user must prove before a right authorizes.
///
/// The shape is closed on purpose: biometry may carry a fallback, a
/// passcode-only requirement cannot. Immutable once constructed; the value is
/// handed to the authentication service to select the proof path and stored
/// alongside each secret record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Requirement {
    Biometry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<Fallback>,
    },
    DevicePasscode,
}

impl Requirement {
    /// Biometric proof with no fallback.
    pub fn biometry() -> Self {
        Requirement::Biometry { fallback: None }
    }

    /// Biometric proof, falling back to the device passcode when biometry
    /// cannot complete.
    pub fn biometry_or_passcode() -> Self {
        Requirement::Biometry {
            fallback: Some(Fallback::DevicePasscode),
        }
    }

    /// Device passcode only.
    pub fn device_passcode() -> Self {
        Requirement::DevicePasscode
    }

    pub fn fallback(&self) -> Option<Fallback> {
        match self {
            Requirement::Biometry { fallback } => *fallback,
            Requirement::DevicePasscode => None,
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback().is_some()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Biometry { fallback: None } => f.write_str("biometry"),
            Requirement::Biometry {
                fallback: Some(Fallback::DevicePasscode),
            } => f.write_str("biometry with device-passcode fallback"),
            Requirement::DevicePasscode => f.write_str("device passcode"),
        }
    }
}
