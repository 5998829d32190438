//! Layered (Sugiyama-style) layout wrapped onto stacked circles.
//!
//! Layers come from longest-path layering over the directed links. Each layer
//! is a horizontal ring, with the rings stacked along Y. Within a ring, the barycenter
//! heuristic reorders nodes by the circular mean angle of their neighbours on
//! the ring above, which untangles most crossings in a few passes.
//!
//! The number of layers is capped. With the default `maxLayers = 0` the cap is
//! ⌈√n⌉ layers, so deep graphs fold their tail into the last ring (a 10-node
//! chain layers as `0, 1, 2, 3, 3, …`). Set `maxLayers` to the graph depth or
//! more for pure longest-path layering.
//!
//! Once placed, nodes breathe: a small radial pulsation keeps the picture
//! alive, so `step()` always returns `true`.

use std::f32::consts::TAU;

use tracing::debug;

use super::Simulation;
use super::settings::{ParamSpec, Settings};
use crate::error::Result;
use crate::graph::{GraphState, NodeId, traversal};
use crate::math::{Vec3, circular_mean, wrap_angle};

/// Fraction of the remaining gap to its breathing target a node covers per step.
const SETTLE_RATE: f32 = 0.2;

/// Phase offset between consecutive nodes' breathing.
const BREATHING_PHASE: f32 = 0.7;

const LAYER_SPACING: ParamSpec =
    ParamSpec::new("layerSpacing", "Layer spacing", 10.0, 300.0, 80.0, 5.0);
const NODE_SPACING: ParamSpec =
    ParamSpec::new("nodeSpacing", "Node spacing", 5.0, 200.0, 40.0, 5.0);
const MAX_LAYERS: ParamSpec = ParamSpec::new("maxLayers", "Max layers", 0.0, 100.0, 0.0, 1.0);
const CROSSING_ITERATIONS: ParamSpec = ParamSpec::new(
    "crossingIterations",
    "Crossing passes",
    0.0,
    200.0,
    24.0,
    1.0,
);
const CONVERGENCE_THRESHOLD: ParamSpec = ParamSpec::new(
    "convergenceThreshold",
    "Convergence threshold",
    0.01,
    10.0,
    0.5,
    0.01,
);
const BREATHING_AMPLITUDE: ParamSpec =
    ParamSpec::new("breathingAmplitude", "Breathing", 0.0, 0.2, 0.02, 0.005);
const BREATHING_SPEED: ParamSpec =
    ParamSpec::new("breathingSpeed", "Breathing speed", 0.0, 0.2, 0.02, 0.005);

pub const PARAMS: &[ParamSpec] = &[
    LAYER_SPACING,
    NODE_SPACING,
    MAX_LAYERS,
    CROSSING_ITERATIONS,
    CONVERGENCE_THRESHOLD,
    BREATHING_AMPLITUDE,
    BREATHING_SPEED,
];

/// Resolved parameters for [`Hierarchical`].
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalConfig {
    /// Vertical distance between rings.
    pub layer_spacing: f32,
    /// Arc length between neighbours on a ring.
    pub node_spacing: f32,
    /// Layer cap. `0` caps at ⌈√n⌉ layers, folding anything deeper into the
    /// last layer; a positive value allows exactly that many layers.
    pub max_layers: usize,
    pub crossing_iterations: usize,
    /// Largest per-node move (world units) that still counts as converged.
    pub convergence_threshold: f32,
    pub breathing_amplitude: f32,
    pub breathing_speed: f32,
}

impl HierarchicalConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.report_unknown(PARAMS);
        Ok(Self {
            layer_spacing: settings.value(&LAYER_SPACING)? as f32,
            node_spacing: settings.value(&NODE_SPACING)? as f32,
            max_layers: settings.value(&MAX_LAYERS)?.round() as usize,
            crossing_iterations: settings.value(&CROSSING_ITERATIONS)?.round() as usize,
            convergence_threshold: settings.value(&CONVERGENCE_THRESHOLD)? as f32,
            breathing_amplitude: settings.value(&BREATHING_AMPLITUDE)? as f32,
            breathing_speed: settings.value(&BREATHING_SPEED)? as f32,
        })
    }

    /// Number of layers allowed for a graph of `node_count` nodes.
    pub fn layer_cap(&self, node_count: usize) -> usize {
        if self.max_layers > 0 {
            self.max_layers
        } else {
            ((node_count as f64).sqrt().ceil() as usize).max(1)
        }
    }

    fn ring_radius(&self, population: usize) -> f32 {
        population as f32 * self.node_spacing / TAU
    }
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            layer_spacing: LAYER_SPACING.default as f32,
            node_spacing: NODE_SPACING.default as f32,
            max_layers: MAX_LAYERS.default as usize,
            crossing_iterations: CROSSING_ITERATIONS.default as usize,
            convergence_threshold: CONVERGENCE_THRESHOLD.default as f32,
            breathing_amplitude: BREATHING_AMPLITUDE.default as f32,
            breathing_speed: BREATHING_SPEED.default as f32,
        }
    }
}

/// Layer index per node.
///
/// Nodes the longest-path pass cannot layer (on or behind a cycle) join the
/// deepest layer it did compute. Everything is then capped at
/// [`HierarchicalConfig::layer_cap`] layers.
pub fn assign_layers(graph: &GraphState, config: &HierarchicalConfig) -> Vec<usize> {
    let computed = traversal::longest_path_layers(graph);
    let deepest = computed.iter().flatten().copied().max().unwrap_or(0);
    let last = config.layer_cap(graph.node_count()) - 1;

    let unlayered = computed.iter().filter(|l| l.is_none()).count();
    if unlayered > 0 {
        debug!(unlayered, deepest, "cyclic nodes moved to the deepest layer");
    }

    computed
        .into_iter()
        .map(|layer| layer.unwrap_or(deepest).min(last))
        .collect()
}

/// Layered ring layout.
pub struct Hierarchical {
    config: HierarchicalConfig,
    layers: Vec<usize>,
    /// Ring order per layer.
    members: Vec<Vec<NodeId>>,
    /// Neighbours of each node on the ring directly above, fixed for the run.
    upper: Vec<Vec<NodeId>>,
    angles: Vec<f32>,
    anchors: Vec<Vec3>,
    crossing_passes: usize,
    ticks: u64,
}

impl Hierarchical {
    /// Layer the graph, place every ring and run crossing reduction.
    ///
    /// Nodes without a position start on their anchor; placed nodes glide there.
    pub fn new(graph: &mut GraphState, config: HierarchicalConfig) -> Self {
        let layers = assign_layers(graph, &config);
        let layer_count = layers.iter().max().map_or(0, |&l| l + 1);

        let mut members: Vec<Vec<NodeId>> = vec![Vec::new(); layer_count];
        for id in graph.node_ids() {
            members[layers[id.index()]].push(id);
        }

        let upper = graph
            .node_ids()
            .map(|id| {
                let layer = layers[id.index()];
                graph
                    .neighbors_undirected(id)
                    .filter(|n| layer > 0 && layers[n.index()] == layer - 1)
                    .collect()
            })
            .collect();

        let n = graph.node_count();
        let mut layout = Self {
            config,
            layers,
            members,
            upper,
            angles: vec![0.0; n],
            anchors: vec![Vec3::ZERO; n],
            crossing_passes: 0,
            ticks: 0,
        };
        for layer in 0..layer_count {
            layout.arrange_ring(layer);
        }
        layout.reduce_crossings();

        for id in (0..n as u32).map(NodeId) {
            if !graph.is_placed(id) {
                graph.set_position(id, layout.anchors[id.index()]);
            }
        }

        debug!(
            layers = layer_count,
            passes = layout.crossing_passes,
            "hierarchical layout placed"
        );
        layout
    }

    pub fn layer_of(&self, node: NodeId) -> usize {
        self.layers[node.index()]
    }

    /// Nodes of `layer` in ring order.
    pub fn layer_members(&self, layer: usize) -> &[NodeId] {
        self.members.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Angle of `node` around its ring, in `[0, 2π)`.
    pub fn angle_of(&self, node: NodeId) -> f32 {
        self.angles[node.index()]
    }

    /// Resting position of `node` before breathing.
    pub fn anchor(&self, node: NodeId) -> Vec3 {
        self.anchors[node.index()]
    }

    /// Barycenter passes run before the order settled or the budget ran out.
    pub fn crossing_passes(&self) -> usize {
        self.crossing_passes
    }

    /// Spread `layer` evenly around its ring in the current member order.
    /// Returns the largest distance any member moved.
    fn arrange_ring(&mut self, layer: usize) -> f32 {
        let population = self.members[layer].len();
        let radius = self.config.ring_radius(population);
        let mid = (self.members.len().saturating_sub(1)) as f32 / 2.0;
        let y = (mid - layer as f32) * self.config.layer_spacing;

        let mut max_shift = 0.0_f32;
        for (i, node) in self.members[layer].iter().enumerate() {
            let angle = TAU * i as f32 / population as f32;
            let anchor = Vec3::new(radius * angle.cos(), y, radius * angle.sin());
            max_shift = max_shift.max((anchor - self.anchors[node.index()]).length());
            self.angles[node.index()] = angle;
            self.anchors[node.index()] = anchor;
        }
        max_shift
    }

    fn barycenter(&self, node: NodeId) -> f32 {
        circular_mean(self.upper[node.index()].iter().map(|u| self.angles[u.index()]))
            .map_or(self.angles[node.index()], wrap_angle)
    }

    fn reduce_crossings(&mut self) {
        if self.members.len() < 2 {
            return;
        }
        for pass in 0..self.config.crossing_iterations {
            let mut max_shift = 0.0_f32;
            for layer in 1..self.members.len() {
                let mut keyed: Vec<(f32, NodeId)> = self.members[layer]
                    .iter()
                    .map(|&node| (self.barycenter(node), node))
                    .collect();
                keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
                self.members[layer] = keyed.into_iter().map(|(_, node)| node).collect();
                max_shift = max_shift.max(self.arrange_ring(layer));
            }
            self.crossing_passes = pass + 1;
            if max_shift <= self.config.convergence_threshold {
                break;
            }
        }
    }

    /// Breathing target of `node` at the current tick.
    pub fn target(&self, node: NodeId) -> Vec3 {
        let phase = self.ticks as f32 * self.config.breathing_speed
            + node.index() as f32 * BREATHING_PHASE;
        let scale = 1.0 + self.config.breathing_amplitude * phase.sin();
        let anchor = self.anchors[node.index()];
        Vec3::new(anchor.x * scale, anchor.y, anchor.z * scale)
    }
}

impl Simulation for Hierarchical {
    fn step(&mut self, graph: &mut GraphState) -> bool {
        self.ticks += 1;
        for node in 0..self.layers.len() {
            let target = self.target(NodeId(node as u32));
            let buffers = graph.buffers_mut();
            let v = (target - buffers.positions[node]) * SETTLE_RATE;
            buffers.velocities[node] = v;
            buffers.positions[node] += v;
        }
        // Breathing never stops, so there is no equilibrium to report.
        true
    }
}
