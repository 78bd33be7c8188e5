use std::{fmt::Display, str::FromStr};

use base58::{FromBase58, ToBase58};
use serde::{Deserialize, Serialize};

use crate::LatticeCommonError;

/// A [`Uid`] is the globally unique key under which any stored object, code
/// item or request is addressed. Internally it is represented as 32 random
/// bytes; once minted it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid([u8; 32]);

impl Uid {
    /// Mint a new, unique [`Uid`].
    pub fn new() -> Self {
        Self(rand::random::<[u8; 32]>())
    }

    /// The raw bytes of this identifier
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The full base58 text form of this identifier
    pub fn to_base58(&self) -> String {
        self.0.to_base58()
    }
}

impl Default for Uid {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[u8; 32]> for Uid {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl TryFrom<Vec<u8>> for Uid {
    type Error = LatticeCommonError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into().map_err(|value: Vec<u8>| {
            LatticeCommonError::InvalidIdentifier(format!(
                "Incorrect length (expected 32, got {})",
                value.len()
            ))
        })?))
    }
}

impl FromStr for Uid {
    type Err = LatticeCommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uid::try_from(s.from_base58().map_err(|error| {
            LatticeCommonError::InvalidIdentifier(format!(
                "Could not convert from base58: {:?}",
                error
            ))
        })?)
    }
}

impl Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{}...",
            self.0
                .iter()
                .take(6)
                .map(|byte| format!("{:X}", byte))
                .collect::<Vec<String>>()
                .concat()
        )
    }
}

/// A [`LineageId`] is a derived identifier: a base [`Uid`] paired with a
/// lineage mark produced by whatever derivation chain minted it. It always
/// resolves to its base identifier before any lookup; no provenance beyond
/// that resolution is retained by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageId {
    base: Uid,
    mark: u64,
}

impl LineageId {
    /// Construct a [`LineageId`] over the given base identifier
    pub fn new(base: Uid, mark: u64) -> Self {
        Self { base, mark }
    }

    /// The base [`Uid`] this lineage identifier resolves to
    pub fn base(&self) -> Uid {
        self.base
    }

    /// The lineage mark carried alongside the base identifier
    pub fn mark(&self) -> u64 {
        self.mark
    }
}

impl From<Uid> for LineageId {
    fn from(value: Uid) -> Self {
        Self {
            base: value,
            mark: 0,
        }
    }
}

impl From<LineageId> for Uid {
    fn from(value: LineageId) -> Self {
        value.base
    }
}

impl From<&LineageId> for Uid {
    fn from(value: &LineageId) -> Self {
        value.base
    }
}

impl Display for LineageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.base, self.mark)
    }
}
