use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use lattice_common::{Uid, time};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// The ordered mapping of parameter name to resolved argument identifier
/// that fingerprints one invocation. Two calls are cache-equivalent exactly
/// when their argument maps are equal; this is identifier equality, never
/// value equality.
pub type ArgumentMap = BTreeMap<String, Uid>;

/// One past execution of a code item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// The input fingerprint of the execution
    pub inputs: ArgumentMap,
    /// The identifiers under which the produced outputs were stored
    pub outputs: Vec<Uid>,
    /// When the record was appended, in milliseconds since the Unix epoch
    pub at_ms: u64,
}

impl ExecutionRecord {
    /// Construct a record over the given fingerprint and outputs, stamped
    /// with the current time
    pub fn new(inputs: ArgumentMap, outputs: Vec<Uid>) -> Self {
        Self {
            inputs,
            outputs,
            at_ms: time::epoch_millis(),
        }
    }

    /// True if this record's input fingerprint equals the given argument map
    pub fn matches(&self, arguments: &ArgumentMap) -> bool {
        &self.inputs == arguments
    }
}

/// The append-only, per-code ledger of past executions.
///
/// Records are immutable once appended and are never deleted in normal
/// operation; the most recently appended record is authoritative for cache
/// lookups.
#[derive(Clone, Debug, Default)]
pub struct OutputHistory {
    records: Arc<RwLock<HashMap<Uid, Vec<ExecutionRecord>>>>,
}

impl OutputHistory {
    /// An empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the given code item's ledger
    pub async fn append(&self, code: Uid, record: ExecutionRecord) {
        let mut records = self.records.write().await;
        records.entry(code).or_default().push(record);
    }

    /// The most recently appended record for the given code item
    pub async fn latest(&self, code: &Uid) -> Option<ExecutionRecord> {
        let records = self.records.read().await;
        records.get(code).and_then(|records| records.last()).cloned()
    }

    /// Every record appended for the given code item, in append order
    pub async fn records_of(&self, code: &Uid) -> Vec<ExecutionRecord> {
        let records = self.records.read().await;
        records.get(code).cloned().unwrap_or_default()
    }

    /// How many times the given code item has executed
    pub async fn execution_count(&self, code: &Uid) -> usize {
        let records = self.records.read().await;
        records.get(code).map(|records| records.len()).unwrap_or(0)
    }
}
