//! Relabel engine — write sequence labels onto Items and publish the snapshot.
//!
//! A pass snapshots the container, writes `"<id>, <time range>"` onto every
//! Item whose display text differs, and publishes the snapshot. Writes notify
//! the host's observers, possibly after the pass has returned, so the engine
//! keeps a guard raised for a short grace period afterwards. While the guard
//! is up, change notifications are the engine's own echo and must not be
//! treated as external changes.

use crate::labeling::snapshot;
use crate::tree::Tree;
use crate::types::record::{SequenceRecord, Snapshot};


/// What a single pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelabelReport {
    pub items: usize,
    pub writes: usize,
    pub failed_writes: usize,
}


pub struct RelabelEngine {
    grace_ms: u64,
    guard_until: Option<u64>,
    published: Snapshot,
    passes: u64,
}


impl RelabelEngine {
    pub fn new(grace_ms: u64) -> Self {
        RelabelEngine {
            grace_ms,
            guard_until: None,
            published: Snapshot::default(),
            passes: 0,
        }
    }

    /// Run one pass over `container` at time `now_ms`.
    ///
    /// Write failures are skipped; the pass always completes and always
    /// publishes. A `None` container publishes an empty snapshot.
    pub fn relabel<T: Tree>(
        &mut self,
        tree: &mut T,
        container: Option<T::Node>,
        now_ms: u64,
    ) -> RelabelReport {
        self.guard_until = Some(now_ms.saturating_add(self.grace_ms));

        let captured = snapshot::capture(tree, container);
        let mut report = RelabelReport {
            items: captured.len(),
            ..RelabelReport::default()
        };
        for item in &captured {
            let label = format_label(&item.record);
            if tree.text(item.node).as_deref() == Some(label.as_str()) {
                continue;
            }
            match tree.set_text(item.node, &label) {
                Ok(()) => report.writes += 1,
                Err(e) => {
                    report.failed_writes += 1;
                    tracing::debug!(target: "settle::relabel", node = ?item.node, error = %e, "label write skipped");
                }
            }
        }

        self.published = captured
            .into_iter()
            .map(|c| c.record)
            .collect::<Vec<_>>()
            .into();
        self.passes += 1;
        tracing::debug!(
            target: "settle::relabel",
            items = report.items,
            writes = report.writes,
            failed = report.failed_writes,
            guard_until = now_ms.saturating_add(self.grace_ms),
            "relabel pass complete"
        );
        report
    }

    /// Whether notifications arriving at `now_ms` are the engine's own echo.
    pub fn in_progress(&self, now_ms: u64) -> bool {
        self.guard_until.is_some_and(|until| now_ms < until)
    }

    /// When the guard comes down, if it is up.
    pub fn guard_deadline(&self) -> Option<u64> {
        self.guard_until
    }

    /// Lower the guard once its grace period has elapsed.
    pub fn release_if_due(&mut self, now_ms: u64) -> bool {
        match self.guard_until {
            Some(until) if now_ms >= until => {
                self.guard_until = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the guard immediately.
    pub fn reset_guard(&mut self) {
        self.guard_until = None;
    }

    /// The snapshot from the latest pass.
    pub fn published(&self) -> Snapshot {
        self.published.clone()
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }
}


/// The on-tree label for a record: `"<id>, <time range>"`.
pub fn format_label(record: &SequenceRecord) -> String {
    format!("{}, {}", record.sequence_id, record.time_range)
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
