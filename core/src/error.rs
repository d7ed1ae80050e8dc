//! Error types for the fallible edges of the crate.
//!
//! The labeling engine itself never fails (a hostile tree degrades to "no
//! items"). Errors only surface where outside input enters: tree writes,
//! settings files and recorded traces.

use std::path::PathBuf;

use thiserror::Error;


/// A host tree refused a read or write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown node {0}")]
    UnknownNode(String),

    #[error("node {0} is detached from the tree")]
    Detached(String),

    #[error("node {0} is read-only")]
    ReadOnly(String),

    #[error("cannot insert {node} under its own descendant {parent}")]
    Cycle { node: String, parent: String },
}


/// Settings could not be loaded or are out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}


/// A recorded trace could not be loaded or replayed.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trace: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("trace refers to unknown node '{0}'")]
    UnknownNode(String),

    #[error("trace declares node '{0}' more than once")]
    DuplicateNode(String),

    #[error("event at {at_ms}ms comes after an event at {previous_ms}ms")]
    OutOfOrder { at_ms: u64, previous_ms: u64 },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
