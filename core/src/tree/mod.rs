//! Tree access — the narrow interface the labeling engine needs from a host.
//!
//! A host (a DOM bridge, a virtual-DOM differ, a filesystem watcher) implements
//! `Tree` for its own node handle type. Queries never fail from the engine's
//! point of view: a host that cannot answer returns an empty result or `None`.
//! Only writes report errors, and the engine treats those as skipped writes.
//!
//! The `mem` module provides `MemTree`, an arena-backed implementation used
//! for trace replay and tests.

pub mod mem;

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::TreeError;


/// One entry of a change-notification batch.
///
/// Mirrors the shape of a DOM mutation record: the node whose children or
/// text changed, plus the nodes added under it and removed from it. A record
/// whose `target` could not be resolved carries `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord<N> {
    pub target: Option<N>,
    pub added: Vec<N>,
    pub removed: Vec<N>,
}


/// A batch of change records delivered together by the host's observer.
pub type ChangeBatch<N> = Vec<ChangeRecord<N>>;


impl<N> ChangeRecord<N> {
    /// A record for a text or attribute change on `target`.
    pub fn touched(target: N) -> Self {
        ChangeRecord {
            target: Some(target),
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// A record for `added` being inserted under `target`.
    pub fn added(target: N, added: N) -> Self {
        ChangeRecord {
            target: Some(target),
            added: vec![added],
            removed: Vec::new(),
        }
    }

    /// A record for `removed` being detached from `target`.
    pub fn removed(target: N, removed: N) -> Self {
        ChangeRecord {
            target: Some(target),
            added: Vec::new(),
            removed: vec![removed],
        }
    }
}


/// A live, externally mutating ordered tree of nodes, some of which are Items.
pub trait Tree {
    /// Stable node identity, usable as a map key.
    type Node: Copy + Eq + Hash + Debug;

    /// The document root. Ancestor walks stop here.
    fn root(&self) -> Option<Self::Node>;

    /// All Items strictly below `scope` (or in the whole tree when `scope` is
    /// `None`), in document order.
    fn items(&self, scope: Option<Self::Node>) -> Vec<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Whether the node carries the Item marker.
    fn is_item(&self, node: Self::Node) -> bool;

    /// Current display text.
    fn text(&self, node: Self::Node) -> Option<String>;

    fn set_text(&mut self, node: Self::Node, text: &str) -> Result<(), TreeError>;

    /// Text captured the first time the node was observed.
    fn original_text(&self, node: Self::Node) -> Option<String>;

    /// Record the original text. A node that already has one keeps it.
    fn stash_original_text(&mut self, node: Self::Node, text: &str) -> Result<(), TreeError>;

    /// Hand out every change recorded since the previous call.
    fn drain_changes(&mut self) -> ChangeBatch<Self::Node>;

    /// Inclusive containment: a node contains itself.
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn has_item_descendant(&self, node: Self::Node) -> bool {
        !self.items(Some(node)).is_empty()
    }
}
