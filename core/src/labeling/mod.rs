//! Labeling — locate, snapshot, relabel and schedule.
//!
//! The `root` module finds the container that owns the Items. The `extract`
//! module splits an Item's text into period and time range. The `snapshot`
//! module reads Items in document order into records. The `relabel` module
//! writes sequence labels back onto the tree and publishes the snapshot. The
//! `scheduler` module decides when a pass runs. The `export` module renders a
//! published snapshot for external consumers.

pub mod export;
pub mod extract;
pub mod relabel;
pub mod root;
pub mod scheduler;
pub mod snapshot;
