//! In-memory tree — an arena of nodes with an observer-style change feed.
//!
//! `MemTree` behaves like a small DOM: nodes have an optional class marker,
//! display text, an ordered child list and a write-once original-text slot.
//! Every structural or text mutation queues a `ChangeRecord`, which
//! `drain_changes` hands out the way a mutation observer would. Removed nodes
//! stay addressable, so a removed Item is still recognisable as an Item.

use std::fmt;

use crate::error::TreeError;
use crate::tree::{ChangeBatch, ChangeRecord, Tree};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);


impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}


#[derive(Debug, Clone)]
struct NodeData {
    class: Option<String>,
    text: String,
    original: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    read_only: bool,
}


#[derive(Debug, Clone)]
pub struct MemTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    item_marker: String,
    changes: ChangeBatch<NodeId>,
}


impl MemTree {
    /// Create a tree holding only a root node. Nodes whose class equals
    /// `item_marker` are Items.
    pub fn new(item_marker: impl Into<String>) -> Self {
        let root = NodeData {
            class: None,
            text: String::new(),
            original: None,
            parent: None,
            children: Vec::new(),
            read_only: false,
        };
        MemTree {
            nodes: vec![root],
            root: NodeId(0),
            item_marker: item_marker.into(),
            changes: Vec::new(),
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn item_marker(&self) -> &str {
        &self.item_marker
    }

    /// Create a detached node. Nothing is recorded until it is inserted.
    pub fn create(&mut self, class: Option<&str>, text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            class: class.map(str::to_string),
            text: text.to_string(),
            original: None,
            parent: None,
            children: Vec::new(),
            read_only: false,
        });
        id
    }

    /// Create a node and append it under `parent` in one step.
    pub fn element(
        &mut self,
        parent: NodeId,
        class: Option<&str>,
        text: &str,
    ) -> Result<NodeId, TreeError> {
        let id = self.create(class, text);
        self.append(parent, id)?;
        Ok(id)
    }

    /// Create an Item (a node carrying the item marker) under `parent`.
    pub fn item(&mut self, parent: NodeId, text: &str) -> Result<NodeId, TreeError> {
        let marker = self.item_marker.clone();
        self.element(parent, Some(&marker), text)
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.prepare_insert(parent, child)?;
        self.node_mut(parent)?.children.push(child);
        self.finish_insert(parent, child)
    }

    /// Move `child` directly before `before`, which must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: NodeId,
    ) -> Result<(), TreeError> {
        if child == before {
            return Ok(());
        }
        if self.node(before)?.parent != Some(parent) {
            return Err(TreeError::UnknownNode(format!("{} under {}", before, parent)));
        }
        self.prepare_insert(parent, child)?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == before)
            .ok_or_else(|| TreeError::UnknownNode(before.to_string()))?;
        self.node_mut(parent)?.children.insert(index, child);
        self.finish_insert(parent, child)
    }

    /// Detach `node` (and its subtree) from its parent.
    pub fn remove(&mut self, node: NodeId) -> Result<(), TreeError> {
        if self.node(node)?.parent.is_none() {
            return Err(TreeError::Detached(node.to_string()));
        }
        self.detach(node)
    }

    /// Make writes to `node` fail, as a hostile host might.
    pub fn set_read_only(&mut self, node: NodeId, read_only: bool) -> Result<(), TreeError> {
        self.node_mut(node)?.read_only = read_only;
        Ok(())
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn class(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).and_then(|n| n.class.as_deref())
    }

    /// Whether the node's ancestor chain reaches the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Number of changes waiting to be drained.
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn node(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| TreeError::UnknownNode(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| TreeError::UnknownNode(id.to_string()))
    }

    fn prepare_insert(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root || self.contains(child, parent) {
            return Err(TreeError::Cycle {
                node: child.to_string(),
                parent: parent.to_string(),
            });
        }
        if self.node(child)?.parent.is_some() {
            self.detach(child)?;
        }
        Ok(())
    }

    fn finish_insert(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.node_mut(child)?.parent = Some(parent);
        self.changes.push(ChangeRecord::added(parent, child));
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.node_mut(node)?.parent.take() else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != node);
        self.changes.push(ChangeRecord::removed(parent, node));
        Ok(())
    }

    fn writable(&self, node: NodeId) -> Result<(), TreeError> {
        if self.node(node)?.read_only {
            return Err(TreeError::ReadOnly(node.to_string()));
        }
        if !self.is_attached(node) {
            return Err(TreeError::Detached(node.to_string()));
        }
        Ok(())
    }
}


impl Tree for MemTree {
    type Node = NodeId;

    fn root(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn items(&self, scope: Option<NodeId>) -> Vec<NodeId> {
        let start = scope.unwrap_or(self.root);
        let Some(data) = self.nodes.get(start.0) else {
            return Vec::new();
        };
        // Pre-order walk; children pushed in reverse so they pop in order.
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = data.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.is_item(id) {
                found.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        found
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn is_item(&self, node: NodeId) -> bool {
        self.class(node) == Some(self.item_marker.as_str())
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.nodes.get(node.0).map(|n| n.text.clone())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        self.writable(node)?;
        self.node_mut(node)?.text = text.to_string();
        self.changes.push(ChangeRecord::touched(node));
        Ok(())
    }

    fn original_text(&self, node: NodeId) -> Option<String> {
        self.nodes.get(node.0).and_then(|n| n.original.clone())
    }

    fn stash_original_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        self.writable(node)?;
        let data = self.node_mut(node)?;
        if data.original.is_none() {
            data.original = Some(text.to_string());
        }
        Ok(())
    }

    fn drain_changes(&mut self) -> ChangeBatch<NodeId> {
        std::mem::take(&mut self.changes)
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MARK: &str = "item";

    #[test]
    fn items_come_back_in_document_order() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let list = tree.element(root, Some("list"), "").unwrap();
        let a = tree.item(list, "a").unwrap();
        let wrap = tree.element(list, None, "").unwrap();
        let b = tree.item(wrap, "b").unwrap();
        let c = tree.item(list, "c").unwrap();
        assert_eq!(tree.items(None), vec![a, b, c]);
        assert_eq!(tree.items(Some(wrap)), vec![b]);
    }

    #[test]
    fn scope_itself_is_not_listed() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let a = tree.item(root, "a").unwrap();
        assert!(tree.items(Some(a)).is_empty());
    }

    #[test]
    fn insert_before_reorders_and_records_both_halves() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let a = tree.item(root, "a").unwrap();
        let b = tree.item(root, "b").unwrap();
        tree.drain_changes();

        tree.insert_before(root, b, a).unwrap();
        assert_eq!(tree.items(None), vec![b, a]);
        let changes = tree.drain_changes();
        assert_eq!(
            changes,
            vec![ChangeRecord::removed(root, b), ChangeRecord::added(root, b)]
        );
    }

    #[test]
    fn removed_item_is_still_an_item() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let a = tree.item(root, "a").unwrap();
        tree.remove(a).unwrap();
        assert!(tree.is_item(a));
        assert!(!tree.is_attached(a));
        assert!(tree.items(None).is_empty());
    }

    #[test]
    fn writes_to_detached_or_read_only_nodes_fail() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let a = tree.item(root, "a").unwrap();
        let b = tree.item(root, "b").unwrap();
        tree.remove(a).unwrap();
        tree.set_read_only(b, true).unwrap();
        assert!(matches!(tree.set_text(a, "x"), Err(TreeError::Detached(_))));
        assert!(matches!(tree.set_text(b, "x"), Err(TreeError::ReadOnly(_))));
        assert_eq!(tree.text(b).as_deref(), Some("b"));
    }

    #[test]
    fn original_text_is_write_once() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let a = tree.item(root, "first").unwrap();
        tree.stash_original_text(a, "first").unwrap();
        tree.stash_original_text(a, "second").unwrap();
        assert_eq!(tree.original_text(a).as_deref(), Some("first"));
    }

    #[test]
    fn cannot_insert_node_under_itself() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let outer = tree.element(root, None, "").unwrap();
        let inner = tree.element(outer, None, "").unwrap();
        assert!(matches!(
            tree.append(inner, outer),
            Err(TreeError::Cycle { .. })
        ));
    }

    #[test]
    fn has_item_descendant_looks_below_the_node() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let wrap = tree.element(root, None, "").unwrap();
        let empty = tree.element(root, None, "").unwrap();
        tree.item(wrap, "a").unwrap();
        assert!(tree.has_item_descendant(wrap));
        assert!(!tree.has_item_descendant(empty));
    }
}
