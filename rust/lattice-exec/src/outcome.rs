use lattice_objects::Payload;
use serde::{Deserialize, Serialize};

/// A result served from the output history rather than fresh execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    /// The visibility-resolved payloads of the historical outputs
    pub payloads: Vec<Payload>,
    /// A non-fatal policy message explaining why history was served
    pub warning: Option<String>,
}

impl CachedResult {
    /// The single payload, when the historical record produced exactly one
    /// output
    pub fn single(&self) -> Option<&Payload> {
        match self.payloads.as_slice() {
            [payload] => Some(payload),
            _ => None,
        }
    }
}

/// What a call produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// The code executed and this is what the caller may see of the result
    Executed(Payload),
    /// A historical result was served in lieu of execution
    Cached(CachedResult),
    /// The code item is not approved to run; carries the status explanation.
    /// This is an ordinary outcome, not an error.
    Unapproved {
        /// The approval provider's explanation
        explanation: String,
    },
}

impl CallOutcome {
    /// True when a historical result was served
    pub fn is_cached(&self) -> bool {
        matches!(self, CallOutcome::Cached(_))
    }

    /// The executed payload, when the call ran fresh
    pub fn executed(&self) -> Option<&Payload> {
        match self {
            CallOutcome::Executed(payload) => Some(payload),
            _ => None,
        }
    }
}
