//! Graph-distance spherical layout.
//!
//! One node is the hub (explicit id, or the highest-degree node). Every other
//! node sits on a shell whose radius grows with its hop distance from the hub:
//!
//! 1. **Layering**: breadth-first search over the undirected links assigns each
//!    node its hop count, capped at `layerCount − 1`. Unreached nodes go to the
//!    outermost shell.
//! 2. **Shells**: the members of layer `l` are spread over a sphere of radius
//!    `l · layerSpacing` with a Fibonacci (golden-angle) distribution. The hub
//!    sits alone at the origin.
//! 3. **Motion**: each step rotates every shell about the vertical axis (deeper
//!    shells slightly faster) and springs nodes toward their rotated targets.
//!
//! The motion never settles: `step()` always returns `true`.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use tracing::{debug, warn};

use super::Simulation;
use super::settings::{ParamSpec, Settings};
use crate::error::{Error, Result};
use crate::graph::{GraphState, NodeId, traversal};
use crate::math::{Vec3, fibonacci_sphere, random_in_cube};

/// Half extent of the cube unplaced nodes start in before springing to their shell.
const SCATTER_EXTENT: f32 = 100.0;

const LAYER_COUNT: ParamSpec = ParamSpec::new("layerCount", "Layers", 2.0, 20.0, 6.0, 1.0);
const LAYER_SPACING: ParamSpec =
    ParamSpec::new("layerSpacing", "Layer spacing", 10.0, 300.0, 60.0, 5.0);
const ROTATION_SPEED: ParamSpec =
    ParamSpec::new("rotationSpeed", "Rotation speed", 0.0, 0.05, 0.003, 0.001);
const DEPTH_SPEEDUP: ParamSpec =
    ParamSpec::new("depthSpeedup", "Depth speed-up", 0.0, 1.0, 0.15, 0.05);
const SPRING_STRENGTH: ParamSpec =
    ParamSpec::new("springStrength", "Spring", 0.005, 0.5, 0.05, 0.005);
const DAMPING: ParamSpec = ParamSpec::new("damping", "Damping", 0.5, 0.99, 0.85, 0.01);

pub const PARAMS: &[ParamSpec] = &[
    LAYER_COUNT,
    LAYER_SPACING,
    ROTATION_SPEED,
    DEPTH_SPEEDUP,
    SPRING_STRENGTH,
    DAMPING,
];

/// Resolved parameters for [`Spherical`].
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalConfig {
    pub layer_count: usize,
    pub layer_spacing: f32,
    pub rotation_speed: f32,
    pub depth_speedup: f32,
    pub spring_strength: f32,
    pub damping: f32,
    /// Explicit hub id. `None` picks the highest-degree node.
    pub hub: Option<String>,
}

impl SphericalConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.report_unknown(PARAMS);
        Ok(Self {
            layer_count: settings.value(&LAYER_COUNT)?.round() as usize,
            layer_spacing: settings.value(&LAYER_SPACING)? as f32,
            rotation_speed: settings.value(&ROTATION_SPEED)? as f32,
            depth_speedup: settings.value(&DEPTH_SPEEDUP)? as f32,
            spring_strength: settings.value(&SPRING_STRENGTH)? as f32,
            damping: settings.value(&DAMPING)? as f32,
            hub: settings.hub.clone(),
        })
    }

    /// Angular velocity of layer `layer`, in radians per step.
    pub fn angular_velocity(&self, layer: usize) -> f32 {
        if layer == 0 {
            return 0.0;
        }
        self.rotation_speed * (1.0 + self.depth_speedup * (layer - 1) as f32)
    }
}

impl Default for SphericalConfig {
    fn default() -> Self {
        Self {
            layer_count: LAYER_COUNT.default as usize,
            layer_spacing: LAYER_SPACING.default as f32,
            rotation_speed: ROTATION_SPEED.default as f32,
            depth_speedup: DEPTH_SPEEDUP.default as f32,
            spring_strength: SPRING_STRENGTH.default as f32,
            damping: DAMPING.default as f32,
            hub: None,
        }
    }
}

/// Node with the most link endpoints; the earliest one wins ties.
pub fn highest_degree(graph: &GraphState) -> Option<NodeId> {
    graph
        .node_ids()
        .fold(None, |best: Option<(NodeId, usize)>, id| {
            let degree = graph.degree(id);
            match best {
                Some((_, best_degree)) if best_degree >= degree => best,
                _ => Some((id, degree)),
            }
        })
        .map(|(id, _)| id)
}

/// Spherical shell layout around a hub.
pub struct Spherical {
    config: SphericalConfig,
    hub: Option<NodeId>,
    /// Shell index per node.
    layers: Vec<usize>,
    /// Unrotated target per node.
    anchors: Vec<Vec3>,
    ticks: u64,
}

impl Spherical {
    /// Layer the graph around its hub and compute each node's shell position.
    ///
    /// Fails with [`Error::UnknownHub`] if an explicit hub id does not resolve.
    pub fn new(graph: &mut GraphState, config: SphericalConfig, mut rng: StdRng) -> Result<Self> {
        let hub = match config.hub.as_deref() {
            Some(id) => Some(
                graph
                    .lookup(id)
                    .ok_or_else(|| Error::UnknownHub { id: id.to_string() })?,
            ),
            None => highest_degree(graph),
        };

        let deepest = config.layer_count.max(2) - 1;
        let layers: Vec<usize> = match hub {
            Some(hub) => traversal::bfs_hops(graph, hub)
                .into_iter()
                .map(|hops| hops.map_or(deepest, |h| h.min(deepest)))
                .collect(),
            None => Vec::new(),
        };

        if let Some(hub) = hub.filter(|&h| graph.degree(h) == 0 && graph.node_count() > 1) {
            warn!(
                hub = graph.id(hub),
                "hub has no links; every other node sits on the outer shell"
            );
        }

        let mut members: Vec<Vec<NodeId>> = vec![Vec::new(); deepest + 1];
        for (slot, &layer) in layers.iter().enumerate() {
            members[layer].push(NodeId(slot as u32));
        }

        let mut anchors = vec![Vec3::ZERO; layers.len()];
        for (layer, nodes) in members.iter().enumerate().skip(1) {
            let radius = layer as f32 * config.layer_spacing;
            for (k, node) in nodes.iter().enumerate() {
                anchors[node.index()] = fibonacci_sphere(k, nodes.len(), radius);
            }
        }

        graph.place_missing(&mut rng, |r| random_in_cube(r, SCATTER_EXTENT));
        debug!(
            hub = hub.map(|h| graph.id(h)),
            shells = members.iter().filter(|m| !m.is_empty()).count(),
            "spherical layers assigned"
        );

        Ok(Self {
            config,
            hub,
            layers,
            anchors,
            ticks: 0,
        })
    }

    pub fn hub(&self) -> Option<NodeId> {
        self.hub
    }

    /// Shell index of a node.
    pub fn layer_of(&self, node: NodeId) -> usize {
        self.layers[node.index()]
    }

    /// Where `node` is heading this step.
    pub fn target(&self, node: NodeId) -> Vec3 {
        let layer = self.layers[node.index()];
        let angle = (self.config.angular_velocity(layer) * self.ticks as f32) % TAU;
        self.anchors[node.index()].rotate_y(angle)
    }
}

impl Simulation for Spherical {
    fn step(&mut self, graph: &mut GraphState) -> bool {
        self.ticks += 1;
        let spring = self.config.spring_strength;
        let damping = self.config.damping;

        for node in 0..self.layers.len() {
            let id = NodeId(node as u32);
            let target = self.target(id);
            let buffers = graph.buffers_mut();
            let pull = (target - buffers.positions[node]) * spring;
            let v = (buffers.velocities[node] + pull) * damping;
            buffers.velocities[node] = v;
            buffers.positions[node] += v;
        }
        // Perpetual motion: the shells keep turning, so there is no equilibrium to report.
        true
    }
}
