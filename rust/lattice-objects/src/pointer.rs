use lattice_common::Uid;
use serde::{Deserialize, Serialize};

use crate::{MemberId, ValueKind};

/// Which representation of the object a pointer refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerTarget {
    /// The private representation; only handed to callers with read access
    Private,
    /// The shareable mock representation
    Mock,
    /// An empty placeholder that keeps the object traceable without
    /// exposing content
    Empty,
}

/// A reference to a stored object on a particular federation member.
///
/// Pointers are always resolvable for an identifier that exists: a caller
/// without read access receives a mock- or empty-targeted pointer rather
/// than an error, so that downstream tooling can keep tracing the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPointer {
    /// The identifier of the object pointed to
    pub uid: Uid,
    /// The federation member on which the object was resolved
    pub location: MemberId,
    /// The representation this pointer refers to
    pub target: PointerTarget,
    /// The kind of the referenced content, when one applies
    pub kind: Option<ValueKind>,
}

impl ObjectPointer {
    /// Construct a pointer to the given representation of an object
    pub fn new(
        uid: Uid,
        location: MemberId,
        target: PointerTarget,
        kind: Option<ValueKind>,
    ) -> Self {
        Self {
            uid,
            location,
            target,
            kind,
        }
    }
}
