//! Error type for graph ingestion, settings resolution and algorithm selection.
//!
//! Stepping a layout never fails; errors only surface while building a
//! [`GraphState`](crate::graph::GraphState) or constructing a layout.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown layout algorithm: {key:?}")]
    UnknownAlgorithm { key: String },

    #[error("setting {name:?} must be a finite number, got {value}")]
    InvalidSetting { name: String, value: f64 },

    #[error("hub node {id:?} is not part of the graph")]
    UnknownHub { id: String },

    #[error("link {from:?} -> {to:?} references a node that does not exist")]
    UnresolvedLink { from: String, to: String },

    #[error("node id {id:?} appears more than once")]
    DuplicateNode { id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
