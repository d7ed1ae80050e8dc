//! Settle scheduler — decide *when* to relabel a live tree.
//!
//! Change notifications arrive in bursts while the host reorders its Items.
//! The scheduler drops notifications that cannot affect the Items, ignores
//! the engine's own echo while the relabel guard is up, and commits a pass
//! only after a quiet period with no relevant change. An independent
//! bring-up race guarantees a first pass: it commits as soon as the tree has
//! been quiet for one quiet period, or when the initial ceiling elapses,
//! whichever comes first.
//!
//! Time is a plain millisecond counter supplied by the caller. The scheduler
//! never sleeps; a driver asks for `next_deadline` and calls `tick` when it
//! arrives. `advance_to` is such a driver for virtual time.

use serde::{Deserialize, Serialize};

use crate::labeling::relabel::RelabelEngine;
use crate::labeling::root;
use crate::tree::{ChangeRecord, Tree};
use crate::types::config::SettleSettings;
use crate::types::record::Snapshot;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleState {
    /// No relabel pending.
    Idle,
    /// A relevant change arrived; waiting for the quiet period to elapse.
    AwaitingSettle,
    /// A pass just ran and its echo is being ignored.
    Committing,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitReason {
    /// Explicit "relabel now" request.
    Manual,
    /// The quiet period elapsed after a burst of changes.
    Settled,
    /// Bring-up: the tree was quiet long enough after start.
    BringUpQuiet,
    /// Bring-up: the initial ceiling elapsed while the tree was still busy.
    BringUpCeiling,
}


/// One committed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub at_ms: u64,
    pub reason: CommitReason,
    pub items: usize,
    pub writes: usize,
}


/// What happened to a batch of change records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The scheduler is stopped.
    Stopped,
    /// The batch arrived while the relabel guard was up.
    Guarded,
    /// Nothing in the batch could affect the Items.
    Dropped,
    /// The quiet-period timer was (re)started.
    Scheduled { deadline_ms: u64 },
}


#[derive(Debug, Clone, Copy)]
struct BringUp {
    started_ms: u64,
    done: bool,
}


pub struct SettleScheduler<T: Tree> {
    tree: T,
    settings: SettleSettings,
    engine: RelabelEngine,
    container: Option<T::Node>,
    quiet_deadline: Option<u64>,
    last_external_ms: u64,
    bring_up: Option<BringUp>,
    running: bool,
    commits: u64,
}


impl<T: Tree> SettleScheduler<T> {
    pub fn new(tree: T, settings: SettleSettings) -> Self {
        let engine = RelabelEngine::new(settings.grace_ms);
        SettleScheduler {
            tree,
            settings,
            engine,
            container: None,
            quiet_deadline: None,
            last_external_ms: 0,
            bring_up: None,
            running: false,
            commits: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin monitoring at `now_ms` and arm the bring-up race.
    pub fn start(&mut self, now_ms: u64) {
        self.running = true;
        self.last_external_ms = now_ms;
        self.quiet_deadline = None;
        self.bring_up = Some(BringUp {
            started_ms: now_ms,
            done: false,
        });
        self.container = root::find_container(&self.tree, self.settings.max_ancestor_depth);
        tracing::info!(target: "settle::scheduler", now_ms, found = self.container.is_some(), "monitor started");
    }

    /// Stop monitoring. Timers and the guard are dropped; the published
    /// snapshot is kept.
    pub fn stop(&mut self) {
        self.running = false;
        self.quiet_deadline = None;
        self.bring_up = None;
        self.engine.reset_guard();
        tracing::info!(target: "settle::scheduler", commits = self.commits, "monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Classify a batch of change records and restart the quiet timer if any
    /// of them is relevant.
    pub fn observe(&mut self, batch: &[ChangeRecord<T::Node>], now_ms: u64) -> Observation {
        if !self.running {
            return Observation::Stopped;
        }
        if self.engine.in_progress(now_ms) {
            tracing::trace!(target: "settle::scheduler", now_ms, records = batch.len(), "ignoring own echo");
            return Observation::Guarded;
        }
        if self.container.is_none() {
            self.container = root::find_container(&self.tree, self.settings.max_ancestor_depth);
        }
        if !batch.iter().any(|record| self.is_relevant(record)) {
            return Observation::Dropped;
        }
        let deadline_ms = now_ms.saturating_add(self.settings.quiet_period_ms);
        self.last_external_ms = now_ms;
        self.quiet_deadline = Some(deadline_ms);
        tracing::trace!(target: "settle::scheduler", now_ms, deadline_ms, "quiet timer restarted");
        Observation::Scheduled { deadline_ms }
    }

    /// Drain the tree's own change feed and observe it.
    pub fn pump(&mut self, now_ms: u64) -> Observation {
        let batch = self.tree.drain_changes();
        if batch.is_empty() {
            return Observation::Dropped;
        }
        self.observe(&batch, now_ms)
    }

    /// Fire whatever timers are due at `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Option<Commit> {
        if !self.running {
            return None;
        }
        if self.engine.release_if_due(now_ms) {
            tracing::trace!(target: "settle::scheduler", now_ms, "guard released");
        }

        let quiet_due = self.quiet_deadline.is_some_and(|d| now_ms >= d);
        if self.engine.in_progress(now_ms) {
            if quiet_due {
                let deadline_ms = now_ms.saturating_add(self.settings.quiet_period_ms);
                self.quiet_deadline = Some(deadline_ms);
                tracing::debug!(target: "settle::scheduler", now_ms, deadline_ms, "quiet timer fired during a pass; rescheduled");
            }
            return None;
        }

        let reason = if quiet_due {
            CommitReason::Settled
        } else {
            self.bring_up_due(now_ms)?
        };
        self.quiet_deadline = None;
        Some(self.commit(now_ms, reason))
    }

    /// Relabel immediately, bypassing the debounce. A stopped scheduler
    /// refuses and returns `None`.
    pub fn relabel_now(&mut self, now_ms: u64) -> Option<Commit> {
        if !self.running {
            tracing::debug!(target: "settle::scheduler", now_ms, "manual relabel refused while stopped");
            return None;
        }
        Some(self.commit(now_ms, CommitReason::Manual))
    }

    /// Drive virtual time forward to `target_ms`, firing every deadline on
    /// the way and feeding the tree's change feed back in after each one.
    pub fn advance_to(&mut self, target_ms: u64) -> Vec<Commit> {
        let mut commits = Vec::new();
        while let Some(deadline) = self.next_deadline().filter(|&d| d <= target_ms) {
            if let Some(commit) = self.tick(deadline) {
                commits.push(commit);
            }
            self.pump(deadline);
        }
        commits
    }

    /// Drive virtual time until no timer is pending.
    pub fn settle(&mut self) -> Vec<Commit> {
        self.advance_to(u64::MAX)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self, now_ms: u64) -> SettleState {
        if self.engine.in_progress(now_ms) {
            SettleState::Committing
        } else if self.quiet_deadline.is_some() {
            SettleState::AwaitingSettle
        } else {
            SettleState::Idle
        }
    }

    /// The earliest time at which `tick` has something to do.
    pub fn next_deadline(&self) -> Option<u64> {
        if !self.running {
            return None;
        }
        let guard = self.engine.guard_deadline();
        // Bring-up never commits under the guard, so it waits for it.
        let bring_up = self
            .bring_up_deadline()
            .map(|d| guard.map_or(d, |g| d.max(g)));
        [guard, self.quiet_deadline, bring_up]
            .into_iter()
            .flatten()
            .min()
    }

    /// The snapshot from the latest pass.
    pub fn snapshot(&self) -> Snapshot {
        self.engine.published()
    }

    pub fn container(&self) -> Option<T::Node> {
        self.container
    }

    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    pub fn bring_up_pending(&self) -> bool {
        self.bring_up.is_some_and(|b| !b.done)
    }

    pub fn settings(&self) -> &SettleSettings {
        &self.settings
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Mutable access for hosts that drive the tree directly. Changes made
    /// here reach the scheduler through `pump`.
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn is_relevant(&self, record: &ChangeRecord<T::Node>) -> bool {
        if let (Some(container), Some(target)) = (self.container, record.target) {
            if self.tree.contains(container, target) {
                return true;
            }
        }
        record
            .added
            .iter()
            .any(|&n| self.tree.is_item(n) || self.tree.has_item_descendant(n))
            || record.removed.iter().any(|&n| self.tree.is_item(n))
    }

    fn bring_up_deadline(&self) -> Option<u64> {
        let bring_up = self.bring_up.filter(|b| !b.done)?;
        let quiet = self
            .last_external_ms
            .saturating_add(self.settings.quiet_period_ms);
        let ceiling = bring_up
            .started_ms
            .saturating_add(self.settings.initial_ceiling_ms);
        Some(quiet.min(ceiling))
    }

    fn bring_up_due(&self, now_ms: u64) -> Option<CommitReason> {
        let bring_up = self.bring_up.filter(|b| !b.done)?;
        if now_ms >= self.last_external_ms.saturating_add(self.settings.quiet_period_ms) {
            Some(CommitReason::BringUpQuiet)
        } else if now_ms >= bring_up.started_ms.saturating_add(self.settings.initial_ceiling_ms) {
            Some(CommitReason::BringUpCeiling)
        } else {
            None
        }
    }

    fn commit(&mut self, now_ms: u64, reason: CommitReason) -> Commit {
        self.container = root::find_container(&self.tree, self.settings.max_ancestor_depth);
        let report = self.engine.relabel(&mut self.tree, self.container, now_ms);

        // Everything queued so far is reflected in the pass just taken,
        // including the pass's own writes.
        let echoed = self.tree.drain_changes();

        if let Some(b) = self.bring_up.as_mut() {
            b.done = true;
        }
        self.commits += 1;
        tracing::info!(
            target: "settle::scheduler",
            now_ms,
            ?reason,
            items = report.items,
            writes = report.writes,
            echoed = echoed.len(),
            "committed relabel"
        );
        Commit {
            at_ms: now_ms,
            reason,
            items: report.items,
            writes: report.writes,
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::mem::{MemTree, NodeId};

    fn settings() -> SettleSettings {
        SettleSettings {
            item_marker: "item".into(),
            ..SettleSettings::default()
        }
    }

    fn monitored(texts: &[&str]) -> (SettleScheduler<MemTree>, NodeId) {
        let mut tree = MemTree::new("item");
        let root = tree.root_id();
        let list = tree.element(root, None, "").unwrap();
        for t in texts {
            tree.item(list, t).unwrap();
        }
        tree.drain_changes();
        let mut scheduler = SettleScheduler::new(tree, settings());
        scheduler.start(0);
        (scheduler, list)
    }

    #[test]
    fn quiet_tree_is_labeled_after_one_quiet_period() {
        let (mut s, _) = monitored(&["A", "B"]);
        assert_eq!(s.next_deadline(), Some(700));
        let commits = s.advance_to(10_000);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].at_ms, 700);
        assert_eq!(commits[0].reason, CommitReason::BringUpQuiet);
        assert!(!s.bring_up_pending());
    }

    #[test]
    fn irrelevant_change_is_dropped() {
        let (mut s, _) = monitored(&["A"]);
        s.advance_to(1000);
        let root = s.tree().root_id();
        let banner = s.tree_mut().element(root, Some("banner"), "hi").unwrap();
        s.tree_mut().set_text(banner, "hello").unwrap();
        assert_eq!(s.pump(1500), Observation::Dropped);
        assert_eq!(s.state(1500), SettleState::Idle);
    }

    #[test]
    fn change_inside_container_schedules() {
        let (mut s, list) = monitored(&["A", "B"]);
        s.advance_to(1000);
        let first = s.tree().items(Some(list))[0];
        s.tree_mut().set_text(first, "edited").unwrap();
        assert_eq!(s.pump(1500), Observation::Scheduled { deadline_ms: 2200 });
        assert_eq!(s.state(1500), SettleState::AwaitingSettle);
    }

    #[test]
    fn added_wrapper_with_item_is_relevant() {
        let (mut s, _) = monitored(&["A"]);
        s.advance_to(1000);
        let root = s.tree().root_id();
        let wrapper = s.tree_mut().create(None, "");
        s.tree_mut().item(wrapper, "B").unwrap();
        s.tree_mut().drain_changes();
        s.tree_mut().append(root, wrapper).unwrap();
        assert!(matches!(s.pump(1500), Observation::Scheduled { .. }));
    }

    #[test]
    fn events_during_guard_are_ignored() {
        let (mut s, list) = monitored(&["A"]);
        s.advance_to(700);
        let first = s.tree().items(Some(list))[0];
        s.tree_mut().set_text(first, "echo").unwrap();
        assert_eq!(s.pump(750), Observation::Guarded);
        assert_eq!(s.state(750), SettleState::Committing);
        assert_eq!(s.state(780), SettleState::Idle);
    }

    #[test]
    fn quiet_timer_due_during_guard_is_rescheduled() {
        let (mut s, list) = monitored(&["A", "B"]);
        s.advance_to(700);
        let first = s.tree().items(Some(list))[0];
        s.tree_mut().set_text(first, "external").unwrap();
        s.pump(1000); // quiet deadline 1700
        s.relabel_now(1650); // guard until 1730

        assert_eq!(s.tick(1700), None);
        assert_eq!(s.next_deadline(), Some(1730));
        let commits = s.advance_to(5000);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].at_ms, 2400);
        assert_eq!(commits[0].reason, CommitReason::Settled);
    }

    #[test]
    fn manual_relabel_satisfies_bring_up() {
        let (mut s, _) = monitored(&["A"]);
        let commit = s.relabel_now(10).unwrap();
        assert_eq!(commit.reason, CommitReason::Manual);
        assert!(!s.bring_up_pending());
        assert!(s.settle().is_empty());
    }

    #[test]
    fn stopped_scheduler_ignores_everything() {
        let (mut s, list) = monitored(&["A"]);
        s.advance_to(700);
        s.stop();
        let first = s.tree().items(Some(list))[0];
        s.tree_mut().set_text(first, "x").unwrap();
        assert_eq!(s.pump(2000), Observation::Stopped);
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.tick(5000), None);
        assert_eq!(s.snapshot().len(), 1);
    }

    #[test]
    fn empty_tree_commits_empty_snapshot() {
        let (mut s, _) = monitored(&[]);
        let commits = s.settle();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].items, 0);
        assert!(s.snapshot().is_empty());
        assert_eq!(s.container(), None);
    }

    #[test]
    fn record_without_target_or_nodes_is_dropped() {
        let (mut s, _) = monitored(&["A"]);
        s.advance_to(1000);
        let record = ChangeRecord {
            target: None,
            added: Vec::new(),
            removed: Vec::new(),
        };
        assert_eq!(s.observe(&[record], 1500), Observation::Dropped);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn item_removed_outside_container_is_relevant() {
        let (mut s, _) = monitored(&["A"]);
        s.advance_to(1000);
        let root = s.tree().root_id();
        let stray = s.tree_mut().create(Some("item"), "stray");
        let record = ChangeRecord::removed(root, stray);
        assert_eq!(
            s.observe(&[record], 1500),
            Observation::Scheduled { deadline_ms: 2200 }
        );
    }

    #[test]
    fn removed_wrapper_outside_container_is_dropped() {
        // Removals only count when the removed node is itself an Item.
        let (mut s, _) = monitored(&["A"]);
        s.advance_to(1000);
        let root = s.tree().root_id();
        let wrapper = s.tree_mut().create(None, "");
        s.tree_mut().item(wrapper, "B").unwrap();
        let record = ChangeRecord::removed(root, wrapper);
        assert_eq!(s.observe(&[record], 1500), Observation::Dropped);
    }

    #[test]
    fn plain_node_added_outside_container_is_dropped() {
        let (mut s, _) = monitored(&["A"]);
        s.advance_to(1000);
        let root = s.tree().root_id();
        let plain = s.tree_mut().create(None, "ad");
        let record = ChangeRecord::added(root, plain);
        assert_eq!(s.observe(&[record], 1500), Observation::Dropped);
        assert_eq!(s.state(1500), SettleState::Idle);
    }

    #[test]
    fn restart_rearms_bring_up() {
        let (mut s, _) = monitored(&["A"]);
        s.settle();
        assert!(!s.bring_up_pending());

        s.stop();
        s.start(5000);
        assert!(s.bring_up_pending());
        assert_eq!(s.next_deadline(), Some(5700));
        let commits = s.advance_to(10_000);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].at_ms, 5700);
        assert_eq!(commits[0].reason, CommitReason::BringUpQuiet);
    }

    #[test]
    fn manual_relabel_is_refused_while_stopped() {
        let (mut s, _) = monitored(&["A"]);
        s.stop();
        assert_eq!(s.relabel_now(100), None);
        assert_eq!(s.commit_count(), 0);
        assert_eq!(s.state(100), SettleState::Idle);
        assert_eq!(s.next_deadline(), None);
    }
}
