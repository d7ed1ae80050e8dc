//! Settle — order-stable, debounced relabeling of a live item tree.
//!
//! A host tree reorders its Items in bursts. Settle waits for the bursts to
//! end, then numbers the Items in their final order, writes the numbers back
//! onto the tree without mistaking its own writes for new changes, and
//! publishes an immutable snapshot for export.
//!
//! Modules, leaf first: `tree` (host abstraction and `MemTree`), `labeling`
//! (container location, extraction, snapshot, relabel, scheduling, export),
//! `sys` (command dispatch), `trace` (recorded replay), `live` (async driver).

pub mod command;
pub mod error;
pub mod help;
pub mod labeling;
pub mod live;
pub mod response;
pub mod sys;
pub mod trace;
pub mod tree;
pub mod types;

pub use error::{ConfigError, TraceError, TreeError};
pub use labeling::scheduler::{Commit, CommitReason, Observation, SettleScheduler, SettleState};
pub use tree::mem::{MemTree, NodeId};
pub use tree::{ChangeBatch, ChangeRecord, Tree};
pub use types::config::SettleSettings;
pub use types::record::{SequenceRecord, Snapshot};
