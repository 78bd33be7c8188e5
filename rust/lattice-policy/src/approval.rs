use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use lattice_common::Uid;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Where a code item stands in the review process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// The code item may execute
    Approved,
    /// The code item awaits review
    Pending,
    /// The code item was refused
    Denied,
}

/// The approval state of a code item, with an optional reviewer note.
///
/// An unapproved status is an expected, recoverable outcome: the authorizer
/// surfaces its explanation to the caller rather than raising an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// The review status
    pub status: ApprovalStatus,
    /// An optional note from the reviewer
    pub note: Option<String>,
}

impl Approval {
    /// An approved status
    pub fn approved() -> Self {
        Self {
            status: ApprovalStatus::Approved,
            note: None,
        }
    }

    /// A pending status carrying the given note
    pub fn pending(note: impl Into<String>) -> Self {
        Self {
            status: ApprovalStatus::Pending,
            note: Some(note.into()),
        }
    }

    /// A denied status carrying the given note
    pub fn denied(note: impl Into<String>) -> Self {
        Self {
            status: ApprovalStatus::Denied,
            note: Some(note.into()),
        }
    }

    /// True when the code item may execute
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    /// The status explanation surfaced to callers of unapproved code
    pub fn explanation(&self) -> String {
        match (&self.status, &self.note) {
            (_, Some(note)) => note.clone(),
            (ApprovalStatus::Approved, None) => "Code is approved to run".into(),
            (ApprovalStatus::Pending, None) => "Code is waiting for approval".into(),
            (ApprovalStatus::Denied, None) => "Code was denied approval".into(),
        }
    }
}

/// The external provider of code approval state. Review workflows live
/// outside this layer; the authorizer only ever asks for the current status.
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    /// The approval state of the given code item
    async fn approval_of(&self, code: &Uid) -> Approval;
}

/// An in-memory [`ApprovalProvider`]. Code items it has never been told
/// about are pending.
#[derive(Clone, Debug, Default)]
pub struct MemoryApprovals {
    approvals: Arc<RwLock<HashMap<Uid, Approval>>>,
}

impl MemoryApprovals {
    /// An empty provider in which every code item is pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the approval state of a code item
    pub async fn set(&self, code: Uid, approval: Approval) {
        let mut approvals = self.approvals.write().await;
        approvals.insert(code, approval);
    }
}

#[async_trait]
impl ApprovalProvider for MemoryApprovals {
    async fn approval_of(&self, code: &Uid) -> Approval {
        let approvals = self.approvals.read().await;
        approvals
            .get(code)
            .cloned()
            .unwrap_or_else(|| Approval::pending("Code is waiting for approval"))
    }
}
