use std::{collections::BTreeSet, fmt::Display};

use lattice_common::{Credential, Uid};
use serde::{Deserialize, Serialize};

/// The kinds of access a credential may hold over an identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    /// May delete the object and is recorded as its claimant
    Owner,
    /// May read the private representation of the object
    Read,
    /// May overwrite the object
    Write,
    /// May use the object as an input to registered code
    Execute,
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Owner => write!(f, "OWNER"),
            Permission::Read => write!(f, "READ"),
            Permission::Write => write!(f, "WRITE"),
            Permission::Execute => write!(f, "EXECUTE"),
        }
    }
}

/// The set of (permission, credential) entitlements attached to one
/// identifier. Created lazily on first write, and never implicitly cleared
/// except when the identifier is deleted.
pub type GrantSet = BTreeSet<(Permission, Credential)>;

/// A [`Grant`] authorizes one credential for one kind of access to one
/// identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Grant {
    /// The identifier access is granted to
    pub uid: Uid,
    /// The kind of access granted
    pub permission: Permission,
    /// The credential receiving access
    pub credential: Credential,
}

impl Grant {
    /// Construct a grant of the given permission
    pub fn new(uid: Uid, permission: Permission, credential: Credential) -> Self {
        Self {
            uid,
            permission,
            credential,
        }
    }

    /// An [`Permission::Owner`] grant
    pub fn owner(uid: Uid, credential: Credential) -> Self {
        Self::new(uid, Permission::Owner, credential)
    }

    /// A [`Permission::Read`] grant
    pub fn read(uid: Uid, credential: Credential) -> Self {
        Self::new(uid, Permission::Read, credential)
    }

    /// A [`Permission::Write`] grant
    pub fn write(uid: Uid, credential: Credential) -> Self {
        Self::new(uid, Permission::Write, credential)
    }

    /// A [`Permission::Execute`] grant
    pub fn execute(uid: Uid, credential: Credential) -> Self {
        Self::new(uid, Permission::Execute, credential)
    }

    /// The (permission, credential) entry this grant contributes to an
    /// identifier's [`GrantSet`]
    pub fn entry(&self) -> (Permission, Credential) {
        (self.permission, self.credential)
    }
}

impl Display for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {} for {}", self.permission, self.uid, self.credential)
    }
}
