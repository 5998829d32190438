//! Graph records and the arena the layout algorithms mutate.
//!
//! Ingestion records ([`NodeRecord`], [`LinkRecord`]) are resolved once into a
//! [`GraphState`]: petgraph's StableGraph for topology plus Structure of Arrays
//! buffers for positions, velocities and forces.

mod link;
mod node;
mod state;
pub mod traversal;

pub use link::{DEFAULT_LINK_WEIGHT, Link, LinkRecord};
pub use node::{NodeAttributes, NodeGroup, NodeId, NodeRecord, NodeState};
pub use state::{Bounds3, GraphState, NodeBuffers};
