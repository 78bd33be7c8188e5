use std::fmt::Display;

use lattice_common::Uid;
use serde::{Deserialize, Serialize};

/// Identifies a federation member: one of the servers that may hold a
/// replica of a stored object. Distinct from a [`Credential`], which
/// identifies a caller.
///
/// [`Credential`]: lattice_common::Credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(Uid);

impl MemberId {
    /// Mint a fresh member identifier
    pub fn new() -> Self {
        Self(Uid::new())
    }

    /// The underlying [`Uid`] of this member
    pub fn uid(&self) -> Uid {
        self.0
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uid> for MemberId {
    fn from(value: Uid) -> Self {
        Self(value)
    }
}

impl Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "~{}", self.0)
    }
}
