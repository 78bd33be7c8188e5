use std::{fmt::Display, str::FromStr};

use base58::{FromBase58, ToBase58};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::LatticeCommonError;

/// A [`Credential`] is the opaque, comparable identity of a caller. In
/// practice it is the byte form of an Ed25519 verifying key, but nothing in
/// this layer interprets it beyond equality and ordering; signature
/// verification happens at the service façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Credential([u8; 32]);

impl Credential {
    /// Construct a [`Credential`] from its raw byte form
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw bytes of this credential
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The full base58 text form of this credential
    pub fn to_base58(&self) -> String {
        self.0.to_base58()
    }
}

impl From<&VerifyingKey> for Credential {
    fn from(value: &VerifyingKey) -> Self {
        Self(value.to_bytes())
    }
}

impl From<VerifyingKey> for Credential {
    fn from(value: VerifyingKey) -> Self {
        Self::from(&value)
    }
}

impl FromStr for Credential {
    type Err = LatticeCommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.from_base58().map_err(|error| {
            LatticeCommonError::InvalidCredential(format!(
                "Could not convert from base58: {:?}",
                error
            ))
        })?;

        Ok(Self(bytes.try_into().map_err(|bytes: Vec<u8>| {
            LatticeCommonError::InvalidCredential(format!(
                "Incorrect length (expected 32, got {})",
                bytes.len()
            ))
        })?))
    }
}

impl Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "@{}...",
            self.0
                .iter()
                .take(6)
                .map(|byte| format!("{:X}", byte))
                .collect::<Vec<String>>()
                .concat()
        )
    }
}

/// The coarse role a credential holds within the platform's directory.
///
/// Roles are consulted for blanket authorization only; everything finer
/// grained goes through explicit permission grants.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Role {
    /// An unprivileged caller
    #[default]
    Guest,
    /// A caller that may submit and run registered code
    Analyst,
    /// A custodian of the data held by this federation member
    Steward,
    /// A platform administrator
    Admin,
}

impl Role {
    /// Whether this role is implicitly authorized for every permission on
    /// every identifier, bypassing explicit grants
    pub fn bypasses_grants(&self) -> bool {
        matches!(self, Role::Steward | Role::Admin)
    }
}
