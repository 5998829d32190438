//! Link records and their resolved form.
//!
//! Links connect two nodes by id. The weight is only read by algorithms that
//! treat it as a strength modifier; it is never mutated.

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Weight used when a record carries none.
pub const DEFAULT_LINK_WEIGHT: f32 = 1.0;

/// A link as handed over by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    /// Also read from `value`, the name graph exporters commonly use.
    #[serde(default, alias = "value", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

impl LinkRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: None,
        }
    }

    pub fn weighted(source: impl Into<String>, target: impl Into<String>, weight: f32) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: Some(weight),
        }
    }
}

/// A link whose endpoints resolved to node slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f32,
}

impl Link {
    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
