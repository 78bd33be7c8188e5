use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, PartialEq)]
pub enum LatticeStorageError {
    /// An error that occurs when working with a storage backend
    #[error("Storage backend error: {0}")]
    Backend(String),
}
