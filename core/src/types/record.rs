//! Snapshot records — the ordered result of one labeling pass.

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};


/// One Item as seen by a labeling pass.
///
/// `sequence_id` is 1-based and dense: it is the Item's position in document
/// order at the time of the pass. The text fields are always derived from the
/// Item's original text, never from a label written by a previous pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRecord {
    pub sequence_id: usize,
    pub period_text: String,
    pub time_range: String,
}


/// An immutable, cheaply shared sequence of records.
///
/// A new pass publishes a new `Snapshot`; the previous one is never mutated,
/// so a reader holding a clone keeps a consistent (if stale) view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<[SequenceRecord]>);


impl Snapshot {
    pub fn new(records: Vec<SequenceRecord>) -> Self {
        Snapshot(records.into())
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.0
    }

    /// Look up a record by its 1-based sequence id.
    pub fn by_sequence_id(&self, sequence_id: usize) -> Option<&SequenceRecord> {
        sequence_id
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
    }

    /// Whether both handles point at the same published pass.
    pub fn same_pass(a: &Snapshot, b: &Snapshot) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}


impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::new(Vec::new())
    }
}


impl Deref for Snapshot {
    type Target = [SequenceRecord];

    fn deref(&self) -> &[SequenceRecord] {
        &self.0
    }
}


impl From<Vec<SequenceRecord>> for Snapshot {
    fn from(records: Vec<SequenceRecord>) -> Self {
        Snapshot::new(records)
    }
}


impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}
