//! Graph-distance layering shared by the structural layouts.

use std::collections::VecDeque;

use super::node::NodeId;
use super::state::GraphState;

/// Shortest hop count from `start` to every node, ignoring link direction.
///
/// Unreachable nodes get `None`.
pub fn bfs_hops(graph: &GraphState, start: NodeId) -> Vec<Option<usize>> {
    let mut hops = vec![None; graph.node_count()];
    if start.index() >= hops.len() {
        return hops;
    }

    let mut queue = VecDeque::new();
    hops[start.index()] = Some(0);
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let next = hops[node.index()].map_or(0, |h| h + 1);
        for neighbor in graph.neighbors_undirected(node) {
            let slot = &mut hops[neighbor.index()];
            if slot.is_none() {
                *slot = Some(next);
                queue.push_back(neighbor);
            }
        }
    }
    hops
}

/// Longest-path layering over the directed links.
///
/// Nodes without incoming links sit on layer 0; every other node sits one
/// layer below its deepest predecessor. Relaxation runs breadth-first from the
/// roots, releasing a node once all its predecessors are layered, so nodes on
/// or downstream of a cycle are never released and stay `None`. Self-loops are
/// ignored.
pub fn longest_path_layers(graph: &GraphState) -> Vec<Option<usize>> {
    let n = graph.node_count();
    let mut pending = vec![0usize; n];
    for link in graph.links() {
        if !link.is_self_loop() {
            pending[link.target.index()] += 1;
        }
    }

    // Tentative depth; only final once every predecessor has been released.
    let mut depth = vec![0usize; n];
    let mut layers = vec![None; n];
    let mut queue: VecDeque<NodeId> = graph
        .node_ids()
        .filter(|id| pending[id.index()] == 0)
        .collect();

    while let Some(node) = queue.pop_front() {
        let layer = depth[node.index()];
        layers[node.index()] = Some(layer);
        for succ in graph.successors(node) {
            if succ == node {
                continue;
            }
            let i = succ.index();
            depth[i] = depth[i].max(layer + 1);
            pending[i] -= 1;
            if pending[i] == 0 {
                queue.push_back(succ);
            }
        }
    }
    layers
}
