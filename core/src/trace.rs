//! Trace replay — run a recorded tree and change timeline through a scheduler.
//!
//! A trace describes an initial tree and a list of timestamped operations.
//! Replay builds a `MemTree`, starts a scheduler at 0ms, applies each
//! operation at its time (firing every timer that comes due in between),
//! and finally runs until no timer is pending.
//!
//! Format (YAML; JSON is accepted too):
//!   - `tree` — nested nodes with optional `name`, `class`, `text`, `children`
//!   - `events` — `{ at_ms, op, ... }` with `op` one of `append`, `remove`,
//!     `move`, `set_text`, `relabel_now`
//!   - `annotations` — optional export annotations, one per item

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TreeError};
use crate::labeling::scheduler::{Commit, SettleScheduler};
use crate::tree::mem::{MemTree, NodeId};
use crate::tree::Tree;
use crate::types::config::SettleSettings;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceOp {
    /// Insert a new subtree under `parent`, before `before` or at the end.
    Append {
        parent: String,
        node: NodeSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<String>,
    },
    Remove {
        node: String,
    },
    /// Move an existing node. `parent` defaults to its current parent.
    Move {
        node: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<String>,
    },
    SetText {
        node: String,
        text: String,
    },
    RelabelNow,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub op: TraceOp,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub tree: Vec<NodeSpec>,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
    #[serde(default)]
    pub annotations: Vec<String>,
}


impl Trace {
    pub fn from_yaml_str(input: &str) -> Result<Trace, TraceError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn from_file(path: &Path) -> Result<Trace, TraceError> {
        let content = std::fs::read_to_string(path).map_err(|source| TraceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}


/// The outcome of a replay: the scheduler in its final state plus every pass
/// it committed, in order.
pub struct Replay {
    pub scheduler: SettleScheduler<MemTree>,
    pub commits: Vec<Commit>,
    pub finished_ms: u64,
}


/// Replay `trace` with `settings`.
pub fn replay(trace: &Trace, settings: SettleSettings) -> Result<Replay, TraceError> {
    settings.validate()?;
    check_order(&trace.events)?;

    let mut tree = MemTree::new(settings.item_marker.clone());
    let mut names = HashMap::new();
    let root = tree.root_id();
    for spec in &trace.tree {
        build(&mut tree, &mut names, root, spec, None)?;
    }
    // Building the initial tree is not a change anyone observed.
    tree.drain_changes();

    let mut scheduler = SettleScheduler::new(tree, settings);
    scheduler.start(0);

    let mut commits = Vec::new();
    let mut now_ms = 0;
    for event in &trace.events {
        now_ms = event.at_ms;
        commits.extend(scheduler.advance_to(now_ms));
        if let TraceOp::RelabelNow = event.op {
            commits.extend(scheduler.relabel_now(now_ms));
        } else {
            apply(scheduler.tree_mut(), &mut names, &event.op)?;
        }
        scheduler.pump(now_ms);
    }

    while let Some(deadline) = scheduler.next_deadline() {
        now_ms = deadline;
        commits.extend(scheduler.advance_to(deadline));
    }
    tracing::info!(target: "settle::trace", events = trace.events.len(), commits = commits.len(), finished_ms = now_ms, "replay finished");

    Ok(Replay {
        scheduler,
        commits,
        finished_ms: now_ms,
    })
}


// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_order(events: &[TraceEvent]) -> Result<(), TraceError> {
    for pair in events.windows(2) {
        if pair[1].at_ms < pair[0].at_ms {
            return Err(TraceError::OutOfOrder {
                at_ms: pair[1].at_ms,
                previous_ms: pair[0].at_ms,
            });
        }
    }
    Ok(())
}


fn build(
    tree: &mut MemTree,
    names: &mut HashMap<String, NodeId>,
    parent: NodeId,
    spec: &NodeSpec,
    before: Option<NodeId>,
) -> Result<NodeId, TraceError> {
    let id = tree.create(spec.class.as_deref(), &spec.text);
    if let Some(name) = &spec.name {
        if names.insert(name.clone(), id).is_some() {
            return Err(TraceError::DuplicateNode(name.clone()));
        }
    }
    for child in &spec.children {
        build(tree, names, id, child, None)?;
    }
    match before {
        Some(before) => tree.insert_before(parent, id, before)?,
        None => tree.append(parent, id)?,
    }
    Ok(id)
}


fn lookup(names: &HashMap<String, NodeId>, name: &str) -> Result<NodeId, TraceError> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| TraceError::UnknownNode(name.to_string()))
}


fn apply(
    tree: &mut MemTree,
    names: &mut HashMap<String, NodeId>,
    op: &TraceOp,
) -> Result<(), TraceError> {
    match op {
        TraceOp::Append {
            parent,
            node,
            before,
        } => {
            let parent = lookup(names, parent)?;
            let before = before.as_deref().map(|b| lookup(names, b)).transpose()?;
            build(tree, names, parent, node, before)?;
        }
        TraceOp::Remove { node } => {
            tree.remove(lookup(names, node)?)?;
        }
        TraceOp::Move {
            node,
            parent,
            before,
        } => {
            let node = lookup(names, node)?;
            let before = before.as_deref().map(|b| lookup(names, b)).transpose()?;
            let parent = match parent {
                Some(p) => lookup(names, p)?,
                None => before
                    .and_then(|b| tree.parent(b))
                    .or_else(|| tree.parent(node))
                    .ok_or_else(|| TreeError::Detached(node.to_string()))?,
            };
            match before {
                Some(before) => tree.insert_before(parent, node, before)?,
                None => tree.append(parent, node)?,
            }
        }
        TraceOp::SetText { node, text } => {
            tree.set_text(lookup(names, node)?, text)?;
        }
        TraceOp::RelabelNow => {}
    }
    Ok(())
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
