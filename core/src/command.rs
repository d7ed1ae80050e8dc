//! Command — the typed interface for all operations on a monitored tree.
//!
//! Commands are what a UI action or the CLI sends to `Sys`. They serialize
//! as JSON objects tagged by a `command` field.

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------

    #[serde(rename = "status")]
    Status,

    #[serde(rename = "snapshot")]
    Snapshot,

    #[serde(rename = "labels")]
    Labels,

    // -----------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------

    #[serde(rename = "relabel.now")]
    RelabelNow,

    #[serde(rename = "export")]
    Export {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<String>,
    },

    // -----------------------------------------------------------------
    // Help
    // -----------------------------------------------------------------

    #[serde(rename = "help")]
    Help {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },
}
