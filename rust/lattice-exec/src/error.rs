use lattice_common::Uid;
use lattice_objects::LatticeObjectsError;
use lattice_policy::LatticePolicyError;
use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, PartialEq)]
pub enum LatticeExecError {
    /// The named code item is not registered
    #[error("Code item not found: {0}")]
    CodeNotFound(Uid),

    /// A code item with the same digest is already registered
    #[error("The code to be registered already exists")]
    DuplicateCode,

    /// The supplied arguments do not line up with what the caller may run
    #[error("Input mismatch: {0}")]
    InputMismatch(String),

    /// A policy refused the call; the reason is the policy's explanation
    #[error("Policy invalid: {0}")]
    PolicyInvalid(String),

    /// The compute backend failed, or the result could not be persisted.
    /// Carries diagnostic detail; the caller may resubmit.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The call was shaped in a way the authorizer cannot honor
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An error occurred in the capability store
    #[error("Store operation failed: {0}")]
    Store(String),
}

impl From<LatticeObjectsError> for LatticeExecError {
    fn from(value: LatticeObjectsError) -> Self {
        LatticeExecError::Store(format!("{value}"))
    }
}

impl From<LatticePolicyError> for LatticeExecError {
    fn from(value: LatticePolicyError) -> Self {
        LatticeExecError::PolicyInvalid(format!("{value}"))
    }
}
