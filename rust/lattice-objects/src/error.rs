use lattice_common::{Credential, Uid};
use lattice_storage::LatticeStorageError;
use thiserror::Error;

use crate::Permission;

/// The common error type used by this crate
#[derive(Error, Debug, PartialEq)]
pub enum LatticeObjectsError {
    /// No value is stored at the given identifier
    #[error("No value stored at {0}")]
    NotFound(Uid),

    /// The caller lacks the grant required by the attempted operation
    #[error("Permission {permission} on {uid} denied for {credential}")]
    PermissionDenied {
        /// The identifier the operation targeted
        uid: Uid,
        /// The permission the operation required
        permission: Permission,
        /// The credential that was refused
        credential: Credential,
    },

    /// An attempt was made to claim an identifier that is already owned
    #[error("{0} is already owned")]
    AlreadyOwned(Uid),

    /// The object at the given identifier has no shareable mock
    #[error("No mock available for {0}")]
    MockUnavailable(Uid),

    /// An error occurred in storage-related code
    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// A store-internal invariant was violated; this is a defect, not a
    /// recoverable outcome
    #[error("Store invariant violated: {0}")]
    Internal(String),
}

impl From<LatticeStorageError> for LatticeObjectsError {
    fn from(value: LatticeStorageError) -> Self {
        LatticeObjectsError::Storage(format!("{value}"))
    }
}

/// Converts any backend error into the crate error by way of
/// [`LatticeStorageError`]
pub(crate) fn from_backend<E>(error: E) -> LatticeObjectsError
where
    E: Into<LatticeStorageError>,
{
    LatticeObjectsError::from(error.into())
}
