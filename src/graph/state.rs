//! GraphState - the node/link arena every layout algorithm mutates.
//!
//! Topology lives in petgraph's StableGraph; per-node simulation data lives in
//! Structure of Arrays buffers indexed by [`NodeId`] so an algorithm can borrow
//! positions, velocities and forces independently and a host can upload a
//! contiguous position buffer after each step.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::{Directed, Direction};
use rand::Rng;
use serde::Serialize;
use tracing::warn;

use super::link::{DEFAULT_LINK_WEIGHT, Link, LinkRecord};
use super::node::{NodeAttributes, NodeId, NodeRecord, NodeState};
use crate::error::{Error, Result};
use crate::math::Vec3;

/// Axis-aligned bounding box over placed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds3 {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the sphere through the box corners, around [`center`](Self::center).
    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }
}

/// Mutable views over the per-node buffers, borrowed together for one step.
pub struct NodeBuffers<'a> {
    pub links: &'a [Link],
    pub positions: &'a mut [Vec3],
    pub velocities: &'a mut [Vec3],
    pub forces: &'a mut [Vec3],
    pub states: &'a [NodeState],
}

/// The graph being laid out.
///
/// This struct manages:
/// - Graph topology via petgraph (link weight as edge weight)
/// - Position/velocity/force buffers in SoA layout
/// - Node state (placed, pinned)
/// - The mapping between caller ids and dense slots
#[derive(Clone)]
pub struct GraphState {
    topology: StableGraph<NodeId, f32, Directed>,

    /// Caller id for each slot.
    ids: Vec<String>,

    /// Caller id to slot. Duplicate ids point at their latest slot.
    slots: HashMap<String, NodeId>,

    /// Resolved links in ingestion order.
    links: Vec<Link>,

    /// Links dropped because an endpoint did not resolve.
    skipped_links: usize,

    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    forces: Vec<Vec3>,
    states: Vec<NodeState>,
    attributes: Vec<NodeAttributes>,
}

impl GraphState {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize, link_capacity: usize) -> Self {
        Self {
            topology: StableGraph::with_capacity(node_capacity, link_capacity),
            ids: Vec::with_capacity(node_capacity),
            slots: HashMap::with_capacity(node_capacity),
            links: Vec::with_capacity(link_capacity),
            skipped_links: 0,
            positions: Vec::with_capacity(node_capacity),
            velocities: Vec::with_capacity(node_capacity),
            forces: Vec::with_capacity(node_capacity),
            states: Vec::with_capacity(node_capacity),
            attributes: Vec::with_capacity(node_capacity),
        }
    }

    /// Build a graph from ingestion records.
    ///
    /// Links with an endpoint that does not resolve are skipped and counted
    /// (see [`skipped_links`](Self::skipped_links)); nothing else is validated.
    pub fn from_records(nodes: &[NodeRecord], links: &[LinkRecord]) -> Self {
        let mut graph = Self::with_capacity(nodes.len(), links.len());
        for node in nodes {
            graph.add_node(node);
        }
        for link in links {
            graph.add_link(link);
        }
        if graph.skipped_links > 0 {
            warn!(
                skipped = graph.skipped_links,
                total = links.len(),
                "skipped links with unresolved endpoints"
            );
        }
        graph
    }

    /// Build a graph from ingestion records, rejecting duplicate node ids and
    /// links whose endpoints do not resolve.
    pub fn try_from_records(nodes: &[NodeRecord], links: &[LinkRecord]) -> Result<Self> {
        let mut graph = Self::with_capacity(nodes.len(), links.len());
        for node in nodes {
            if graph.slots.contains_key(&node.id) {
                return Err(Error::DuplicateNode {
                    id: node.id.clone(),
                });
            }
            graph.add_node(node);
        }
        for link in links {
            if graph.add_link(link).is_none() {
                return Err(Error::UnresolvedLink {
                    from: link.source.clone(),
                    to: link.target.clone(),
                });
            }
        }
        Ok(graph)
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Append a node. A record with a position starts out placed.
    pub fn add_node(&mut self, record: &NodeRecord) -> NodeId {
        let id = NodeId(self.ids.len() as u32);
        let index = self.topology.add_node(id);
        debug_assert_eq!(index.index(), id.index());

        let mut state = NodeState::new();
        let position = match record.position {
            Some(p) if p.iter().all(|c| c.is_finite()) => {
                state.set_placed(true);
                Vec3::from_array(p)
            }
            _ => Vec3::ZERO,
        };

        self.ids.push(record.id.clone());
        self.slots.insert(record.id.clone(), id);
        self.positions.push(position);
        self.velocities.push(Vec3::ZERO);
        self.forces.push(Vec3::ZERO);
        self.states.push(state);
        self.attributes.push(NodeAttributes {
            label: record.label.clone(),
            size: record.size,
            group: record.group.clone(),
        });
        id
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// All node slots in ingestion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.ids.len() as u32).map(NodeId)
    }

    /// Slot for a caller id.
    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.slots.get(id).copied()
    }

    /// Caller id of a slot.
    pub fn id(&self, node: NodeId) -> &str {
        &self.ids[node.index()]
    }

    pub fn attributes(&self, node: NodeId) -> &NodeAttributes {
        &self.attributes[node.index()]
    }

    pub fn position(&self, node: NodeId) -> Vec3 {
        self.positions[node.index()]
    }

    /// Set a node's position and mark it placed.
    pub fn set_position(&mut self, node: NodeId, position: Vec3) {
        let i = node.index();
        self.positions[i] = position;
        self.states[i].set_placed(true);
    }

    /// Move the node with caller id `id`, e.g. while a user drags it.
    ///
    /// Returns `false` for unknown ids and non-finite coordinates.
    pub fn move_node(&mut self, id: &str, position: Vec3) -> bool {
        if !position.is_finite() {
            return false;
        }
        match self.lookup(id) {
            Some(node) => {
                self.set_position(node, position);
                true
            }
            None => false,
        }
    }

    pub fn velocity(&self, node: NodeId) -> Vec3 {
        self.velocities[node.index()]
    }

    pub fn force(&self, node: NodeId) -> Vec3 {
        self.forces[node.index()]
    }

    pub fn is_placed(&self, node: NodeId) -> bool {
        self.states[node.index()].is_placed()
    }

    /// Pin a node (force integration leaves it in place).
    pub fn pin(&mut self, node: NodeId) {
        self.states[node.index()].set_pinned(true);
    }

    pub fn unpin(&mut self, node: NodeId) {
        self.states[node.index()].set_pinned(false);
    }

    pub fn is_pinned(&self, node: NodeId) -> bool {
        self.states[node.index()].is_pinned()
    }

    /// Give every unplaced node a position drawn from `scatter` and zero velocity.
    ///
    /// Returns the number of nodes that were placed.
    pub fn place_missing<R, F>(&mut self, rng: &mut R, mut scatter: F) -> usize
    where
        R: Rng + ?Sized,
        F: FnMut(&mut R) -> Vec3,
    {
        let mut placed = 0;
        for i in 0..self.states.len() {
            if !self.states[i].is_placed() {
                self.positions[i] = scatter(&mut *rng);
                self.velocities[i] = Vec3::ZERO;
                self.states[i].set_placed(true);
                placed += 1;
            }
        }
        placed
    }

    /// Forget all positions so the next algorithm scatters from scratch.
    pub fn reset_placement(&mut self) {
        for i in 0..self.states.len() {
            self.states[i].set_placed(false);
            self.positions[i] = Vec3::ZERO;
            self.velocities[i] = Vec3::ZERO;
            self.forces[i] = Vec3::ZERO;
        }
    }

    // =========================================================================
    // Link Operations
    // =========================================================================

    /// Resolve and append a link. Returns `None` when an endpoint is unknown.
    pub fn add_link(&mut self, record: &LinkRecord) -> Option<Link> {
        let (Some(source), Some(target)) =
            (self.lookup(&record.source), self.lookup(&record.target))
        else {
            self.skipped_links += 1;
            return None;
        };
        let weight = record
            .weight
            .filter(|w| w.is_finite())
            .unwrap_or(DEFAULT_LINK_WEIGHT);

        self.topology
            .add_edge(NodeIndex::new(source.index()), NodeIndex::new(target.index()), weight);
        let link = Link {
            source,
            target,
            weight,
        };
        self.links.push(link);
        Some(link)
    }

    /// Resolved links in ingestion order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links dropped at ingestion because an endpoint did not resolve.
    pub fn skipped_links(&self) -> usize {
        self.skipped_links
    }

    /// Neighbours ignoring link direction. A node linked twice appears twice.
    pub fn neighbors_undirected(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.topology
            .neighbors_undirected(NodeIndex::new(node.index()))
            .map(|n| self.topology[n])
    }

    /// Sources of links pointing at `node`.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.topology
            .neighbors_directed(NodeIndex::new(node.index()), Direction::Incoming)
            .map(|n| self.topology[n])
    }

    /// Targets of links leaving `node`.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.topology
            .neighbors_directed(NodeIndex::new(node.index()), Direction::Outgoing)
            .map(|n| self.topology[n])
    }

    /// Number of link endpoints at `node` (a self-loop counts twice).
    pub fn degree(&self, node: NodeId) -> usize {
        let index = NodeIndex::new(node.index());
        self.topology.edges_directed(index, Direction::Outgoing).count()
            + self.topology.edges_directed(index, Direction::Incoming).count()
    }

    // =========================================================================
    // Buffer Access
    // =========================================================================

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Borrow all per-node buffers at once for a simulation step.
    pub fn buffers_mut(&mut self) -> NodeBuffers<'_> {
        NodeBuffers {
            links: &self.links,
            positions: &mut self.positions,
            velocities: &mut self.velocities,
            forces: &mut self.forces,
            states: &self.states,
        }
    }

    /// Positions interleaved as `[x0, y0, z0, x1, y1, z1, ...]`.
    pub fn flat_positions(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.positions.len() * 3);
        for p in &self.positions {
            flat.extend_from_slice(&p.to_array());
        }
        flat
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Bounding box of all placed nodes, or `None` if nothing is placed.
    pub fn bounds(&self) -> Option<Bounds3> {
        let mut placed = self
            .positions
            .iter()
            .zip(&self.states)
            .filter(|(_, s)| s.is_placed())
            .map(|(p, _)| *p);

        let first = placed.next()?;
        let (min, max) = placed.fold((first, first), |(min, max), p| {
            (
                Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        });
        Some(Bounds3 { min, max })
    }
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn star() -> GraphState {
        let nodes = ["A", "B", "C", "D"].map(NodeRecord::new);
        let links = [
            LinkRecord::new("A", "B"),
            LinkRecord::new("A", "C"),
            LinkRecord::new("A", "D"),
        ];
        GraphState::from_records(&nodes, &links)
    }

    #[test]
    fn test_from_records() {
        let graph = star();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.link_count(), 3);
        assert_eq!(graph.skipped_links(), 0);
        let a = graph.lookup("A").unwrap();
        assert_eq!(graph.id(a), "A");
        assert_eq!(graph.degree(a), 3);
        assert_eq!(graph.neighbors_undirected(a).count(), 3);
        let b = graph.lookup("B").unwrap();
        assert_eq!(graph.predecessors(b).collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.successors(b).count(), 0);
    }

    #[test]
    fn test_unresolved_links_skipped() {
        let nodes = [NodeRecord::new("A"), NodeRecord::new("B")];
        let links = [
            LinkRecord::new("A", "B"),
            LinkRecord::new("A", "ghost"),
            LinkRecord::new("nobody", "B"),
        ];
        let graph = GraphState::from_records(&nodes, &links);
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.skipped_links(), 2);
    }

    #[test]
    fn test_strict_ingestion() {
        let nodes = [NodeRecord::new("A"), NodeRecord::new("B")];
        let err = GraphState::try_from_records(&nodes, &[LinkRecord::new("A", "Z")]);
        assert!(matches!(err, Err(Error::UnresolvedLink { .. })));

        let dupes = [NodeRecord::new("A"), NodeRecord::new("A")];
        let err = GraphState::try_from_records(&dupes, &[]);
        assert!(matches!(err, Err(Error::DuplicateNode { ref id }) if id == "A"));

        assert!(GraphState::try_from_records(&nodes, &[LinkRecord::new("B", "A")]).is_ok());
    }

    #[test]
    fn test_link_weight_default() {
        let nodes = [NodeRecord::new("A"), NodeRecord::new("B")];
        let links = [LinkRecord::new("A", "B"), LinkRecord::weighted("B", "A", 3.0)];
        let graph = GraphState::from_records(&nodes, &links);
        assert_eq!(graph.links()[0].weight, DEFAULT_LINK_WEIGHT);
        assert_eq!(graph.links()[1].weight, 3.0);
    }

    #[test]
    fn test_placement() {
        let nodes = [NodeRecord::at("A", 1.0, 2.0, 3.0), NodeRecord::new("B")];
        let mut graph = GraphState::from_records(&nodes, &[]);
        let a = graph.lookup("A").unwrap();
        let b = graph.lookup("B").unwrap();
        assert!(graph.is_placed(a));
        assert!(!graph.is_placed(b));

        let mut rng = StdRng::seed_from_u64(1);
        let placed = graph.place_missing(&mut rng, |_| Vec3::new(9.0, 9.0, 9.0));
        assert_eq!(placed, 1);
        assert_eq!(graph.position(a), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(graph.position(b), Vec3::new(9.0, 9.0, 9.0));

        graph.reset_placement();
        assert!(!graph.is_placed(a));
        assert!(graph.bounds().is_none());
    }

    #[test]
    fn test_bounds_skip_unplaced() {
        let nodes = [
            NodeRecord::at("A", -10.0, -5.0, 0.0),
            NodeRecord::at("B", 10.0, 5.0, 2.0),
            NodeRecord::new("C"),
        ];
        let graph = GraphState::from_records(&nodes, &[]);
        let bounds = graph.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-10.0, -5.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(10.0, 5.0, 2.0));
        assert_eq!(bounds.center(), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_flat_positions() {
        let nodes = [NodeRecord::at("A", 1.0, 2.0, 3.0), NodeRecord::at("B", 4.0, 5.0, 6.0)];
        let graph = GraphState::from_records(&nodes, &[]);
        assert_eq!(graph.flat_positions(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_pin_unpin() {
        let mut graph = star();
        let a = graph.lookup("A").unwrap();
        assert!(!graph.is_pinned(a));
        graph.pin(a);
        assert!(graph.is_pinned(a));
        graph.unpin(a);
        assert!(!graph.is_pinned(a));
    }

    #[test]
    fn test_move_node_rejects_non_finite() {
        let mut graph = star();
        let a = graph.lookup("A").unwrap();
        assert!(graph.move_node("A", Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(graph.position(a), Vec3::new(4.0, 5.0, 6.0));
        assert!(graph.is_placed(a));

        assert!(!graph.move_node("A", Vec3::new(f32::NAN, 0.0, 0.0)));
        assert!(!graph.move_node("A", Vec3::new(0.0, f32::INFINITY, 0.0)));
        assert_eq!(graph.position(a), Vec3::new(4.0, 5.0, 6.0));
        assert!(!graph.move_node("missing", Vec3::ZERO));
    }
}
