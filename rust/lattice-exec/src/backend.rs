use std::collections::BTreeMap;

use async_trait::async_trait;
use lattice_objects::StoredObject;
use thiserror::Error;

use crate::CodeItem;

/// An infrastructure failure in the compute backend.
///
/// Errors produced by the computation itself are not [`ComputeError`]s: they
/// come back as [`Payload::Failure`] inside an `Ok` result and are valid
/// outputs of the call pipeline.
///
/// [`Payload::Failure`]: lattice_objects::Payload::Failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Compute backend failure: {detail}")]
pub struct ComputeError {
    /// What went wrong, as reported by the backend
    pub detail: String,
}

impl ComputeError {
    /// A compute error carrying the given detail
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// The external compute backend the authorizer delegates to. Scheduling,
/// containment and timeouts are its responsibility; the authorizer holds no
/// store lock while a computation is in flight and never retries.
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Run the given code item over the resolved argument objects,
    /// producing a plain value, a twin, or a failure captured as data
    async fn execute(
        &self,
        code: &CodeItem,
        arguments: &BTreeMap<String, StoredObject>,
    ) -> Result<StoredObject, ComputeError>;
}
