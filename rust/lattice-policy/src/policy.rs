use lattice_common::{Credential, Role, Uid};

use crate::{ArgumentMap, ExecutionRecord, LatticePolicyError};

/// The context a policy is evaluated against: who is calling, what code is
/// being called, and what that code has done before.
#[derive(Debug, Clone)]
pub struct PolicyContext<'a> {
    /// The code item under evaluation
    pub code: Uid,
    /// The calling credential
    pub credential: &'a Credential,
    /// The caller's role
    pub role: Role,
    /// The code item's past executions, in append order
    pub executions: &'a [ExecutionRecord],
}

/// A policy's answer to "may this code execute right now?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Execution is currently permitted
    Valid,
    /// Execution is not currently permitted
    Invalid {
        /// Why not; surfaced to the caller, and attached as a warning to
        /// cached results served in lieu of execution
        reason: String,
    },
}

impl Verdict {
    /// An invalid verdict with the given reason
    pub fn invalid(reason: impl Into<String>) -> Self {
        Verdict::Invalid {
            reason: reason.into(),
        }
    }

    /// True when execution is permitted
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    /// The invalidity reason, when there is one
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid { reason } => Some(reason),
        }
    }
}

/// An output policy governs whether a code item may produce fresh output in
/// the current context, and what explanation accompanies a refusal.
///
/// Policies are supplied per code item by the registering service and are
/// consulted by the authorizer on every non-override call.
pub trait OutputPolicy: Send + Sync {
    /// Whether execution is currently permitted
    fn evaluate(&self, context: &PolicyContext<'_>) -> Verdict;

    /// Update hook, invoked after each recorded execution of the code item.
    /// The default does nothing; policies that derive their state from
    /// [`PolicyContext::executions`] need no more.
    fn on_execution(&self, context: &PolicyContext<'_>) {
        let _ = context;
    }
}

/// An input policy validates the arguments of a call against policy state
/// when no cached result can be served.
pub trait InputPolicy: Send + Sync {
    /// Validate the given arguments; a failure is a typed result for the
    /// caller to branch on, never a fault
    fn validate(
        &self,
        context: &PolicyContext<'_>,
        arguments: &ArgumentMap,
    ) -> Result<(), LatticePolicyError>;

    /// Update hook, invoked after each recorded execution of the code item
    fn on_execution(&self, context: &PolicyContext<'_>) {
        let _ = context;
    }
}
