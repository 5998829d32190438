//! Node identifiers, ingestion records and per-node state flags.
//!
//! A node in a layout run has:
//! - A caller-supplied string id, unique within the run
//! - A dense slot index ([`NodeId`]) into the session's buffers
//! - Position, velocity and accumulated force (stored by [`GraphState`](super::GraphState))
//! - Display attributes the engine carries but never reads

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense node slot.
///
/// Slots are assigned in ingestion order and never reused within a
/// [`GraphState`](super::GraphState), so a `NodeId` indexes every per-node buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Buffer index for this node.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Grouping tag. Exporters write either a name or a numeric class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeGroup {
    Index(i64),
    Name(String),
}

impl fmt::Display for NodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeGroup::Index(index) => write!(f, "{index}"),
            NodeGroup::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for NodeGroup {
    fn from(index: i64) -> Self {
        NodeGroup::Index(index)
    }
}

impl From<&str> for NodeGroup {
    fn from(name: &str) -> Self {
        NodeGroup::Name(name.to_string())
    }
}

/// A node as handed over by the ingestion layer.
///
/// Fields beyond these (crawler statistics and the like) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Initial position. Nodes without one are scattered by the first algorithm that runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<NodeGroup>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn at(id: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        Self {
            id: id.into(),
            position: Some([x, y, z]),
            ..Default::default()
        }
    }
}

/// Semantic attributes carried for the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAttributes {
    pub label: Option<String>,
    pub size: Option<f32>,
    pub group: Option<NodeGroup>,
}

/// Node state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeState {
    flags: u8,
}

impl NodeState {
    const PLACED: u8 = 0b0000_0001;
    const PINNED: u8 = 0b0000_0010;

    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    /// Whether the node has a defined position.
    #[inline]
    pub fn is_placed(self) -> bool {
        self.flags & Self::PLACED != 0
    }

    #[inline]
    pub fn set_placed(&mut self, placed: bool) {
        if placed {
            self.flags |= Self::PLACED;
        } else {
            self.flags &= !Self::PLACED;
        }
    }

    /// Check if the node is pinned (never moved by force integration).
    #[inline]
    pub fn is_pinned(self) -> bool {
        self.flags & Self::PINNED != 0
    }

    #[inline]
    pub fn set_pinned(&mut self, pinned: bool) {
        if pinned {
            self.flags |= Self::PINNED;
        } else {
            self.flags &= !Self::PINNED;
        }
    }
}
