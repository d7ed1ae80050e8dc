//! Snapshotter — read the Items under a container into ordered records.
//!
//! A snapshot always reads an Item's *original* text, captured on first
//! sight, so taking a snapshot of a tree that has already been relabeled
//! yields the same period and time range as before.

use crate::labeling::extract;
use crate::tree::Tree;
use crate::types::record::{SequenceRecord, Snapshot};


/// A record together with the node it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedItem<N> {
    pub node: N,
    pub record: SequenceRecord,
}


/// Capture every Item under `container` in document order.
///
/// Items seen for the first time get their current display text stashed as
/// original text. An Item whose text cannot be read is not stashed. A `None`
/// container yields no items.
pub fn capture<T: Tree>(tree: &mut T, container: Option<T::Node>) -> Vec<CapturedItem<T::Node>> {
    let Some(container) = container else {
        return Vec::new();
    };
    tree.items(Some(container))
        .into_iter()
        .enumerate()
        .map(|(i, node)| {
            if tree.original_text(node).is_none() {
                // An unreadable item stays unstashed so a later pass retries.
                match tree.text(node) {
                    Some(current) => {
                        if let Err(e) = tree.stash_original_text(node, &current) {
                            tracing::debug!(target: "settle::snapshot", node = ?node, error = %e, "could not stash original text");
                        }
                    }
                    None => {
                        tracing::debug!(target: "settle::snapshot", node = ?node, "text unreadable; original text not captured");
                    }
                }
            }
            CapturedItem {
                node,
                record: record_for(tree, node, i + 1),
            }
        })
        .collect()
}


/// Take a snapshot of the Items under `container`.
pub fn snapshot<T: Tree>(tree: &mut T, container: Option<T::Node>) -> Snapshot {
    capture(tree, container)
        .into_iter()
        .map(|c| c.record)
        .collect::<Vec<_>>()
        .into()
}


/// Read-only snapshot: same records as `snapshot`, but nothing is stashed.
///
/// Items never seen before are read from their display text.
pub fn peek<T: Tree>(tree: &T, container: Option<T::Node>) -> Snapshot {
    let Some(container) = container else {
        return Snapshot::default();
    };
    tree.items(Some(container))
        .into_iter()
        .enumerate()
        .map(|(i, node)| record_for(tree, node, i + 1))
        .collect::<Vec<_>>()
        .into()
}


fn record_for<T: Tree>(tree: &T, node: T::Node, sequence_id: usize) -> SequenceRecord {
    // A host that refused the stash still gets a best-effort reading.
    let original = tree
        .original_text(node)
        .or_else(|| tree.text(node))
        .unwrap_or_default();
    let label = extract::parse(&original);
    SequenceRecord {
        sequence_id,
        period_text: label.period_text,
        time_range: label.time_range,
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
