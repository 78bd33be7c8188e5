use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, PartialEq)]
pub enum LatticeCommonError {
    /// Raw bytes or text could not be interpreted as an identifier
    #[error("Could not convert into an identifier: {0}")]
    InvalidIdentifier(String),

    /// Raw bytes or text could not be interpreted as a credential
    #[error("Could not convert into a credential: {0}")]
    InvalidCredential(String),
}
