use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, PartialEq)]
pub enum LatticePolicyError {
    /// An input policy rejected the supplied arguments
    #[error("Input rejected: {0}")]
    InputRejected(String),

    /// An output policy does not permit execution in the current context
    #[error("Output policy invalid: {0}")]
    OutputInvalid(String),
}
