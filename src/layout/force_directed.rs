//! Baseline force-directed layout.
//!
//! Every step accumulates forces, then integrates them:
//!
//! 1. **Repulsion** between every unordered pair, `strength / (d² + 1)` along
//!    the pair's direction. O(n²) per step.
//! 2. **Attraction** along each link, `strength · weight · (d − linkDistance)`,
//!    pulling endpoints together beyond the rest length and apart inside it.
//! 3. **Centering** toward the origin, `−position · centeringStrength`.
//! 4. **Integration**: `v = (v + f·dt)·damping`, speed capped at
//!    `maxVelocity`, every coordinate kept within ±[`COORDINATE_BOUND`].
//!
//! `step()` keeps returning `true` while any node moves faster than
//! [`EQUILIBRIUM_SPEED`].

use rand::rngs::StdRng;
use tracing::debug;

use super::Simulation;
use super::settings::{ParamSpec, Settings};
use crate::error::Result;
use crate::graph::GraphState;
use crate::math::{Vec3, random_in_cube, random_unit};

/// Half extent of the cube unplaced nodes are scattered into.
pub const SCATTER_EXTENT: f32 = 100.0;

/// Hard limit on every coordinate component.
pub const COORDINATE_BOUND: f32 = 1000.0;

/// Speed below which a node counts as stationary.
pub const EQUILIBRIUM_SPEED: f32 = 0.1;

/// Added to squared distances before dividing.
const SOFTENING: f32 = 1.0;

const REPULSIVE_STRENGTH: ParamSpec =
    ParamSpec::new("repulsiveStrength", "Repulsion", 0.0, 1000.0, 100.0, 10.0);
const ATTRACTIVE_STRENGTH: ParamSpec =
    ParamSpec::new("attractiveStrength", "Attraction", 0.0, 1.0, 0.1, 0.01);
const LINK_DISTANCE: ParamSpec =
    ParamSpec::new("linkDistance", "Link distance", 1.0, 300.0, 30.0, 1.0);
const CENTERING_STRENGTH: ParamSpec =
    ParamSpec::new("centeringStrength", "Centering", 0.0, 0.1, 0.01, 0.001);
const DAMPING_FACTOR: ParamSpec =
    ParamSpec::new("dampingFactor", "Damping", 0.5, 0.99, 0.9, 0.01);
const INTEGRATION_STEP: ParamSpec =
    ParamSpec::new("integrationStep", "Time step", 0.05, 2.0, 1.0, 0.05);
const MAX_VELOCITY: ParamSpec =
    ParamSpec::new("maxVelocity", "Max velocity", 1.0, 100.0, 10.0, 1.0);

pub const PARAMS: &[ParamSpec] = &[
    REPULSIVE_STRENGTH,
    ATTRACTIVE_STRENGTH,
    LINK_DISTANCE,
    CENTERING_STRENGTH,
    DAMPING_FACTOR,
    INTEGRATION_STEP,
    MAX_VELOCITY,
];

/// Resolved parameters for [`ForceDirected`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForceDirectedConfig {
    pub repulsive_strength: f32,
    pub attractive_strength: f32,
    pub link_distance: f32,
    pub centering_strength: f32,
    pub damping_factor: f32,
    pub integration_step: f32,
    pub max_velocity: f32,
}

impl ForceDirectedConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.report_unknown(PARAMS);
        Ok(Self {
            repulsive_strength: settings.value(&REPULSIVE_STRENGTH)? as f32,
            attractive_strength: settings.value(&ATTRACTIVE_STRENGTH)? as f32,
            link_distance: settings.value(&LINK_DISTANCE)? as f32,
            centering_strength: settings.value(&CENTERING_STRENGTH)? as f32,
            damping_factor: settings.value(&DAMPING_FACTOR)? as f32,
            integration_step: settings.value(&INTEGRATION_STEP)? as f32,
            max_velocity: settings.value(&MAX_VELOCITY)? as f32,
        })
    }
}

impl Default for ForceDirectedConfig {
    fn default() -> Self {
        Self {
            repulsive_strength: REPULSIVE_STRENGTH.default as f32,
            attractive_strength: ATTRACTIVE_STRENGTH.default as f32,
            link_distance: LINK_DISTANCE.default as f32,
            centering_strength: CENTERING_STRENGTH.default as f32,
            damping_factor: DAMPING_FACTOR.default as f32,
            integration_step: INTEGRATION_STEP.default as f32,
            max_velocity: MAX_VELOCITY.default as f32,
        }
    }
}

/// Repulsive force that the node at `delta` (relative to its partner)
/// receives. The partner receives exactly the negation.
///
/// Returns `None` for coincident nodes, where no direction is defined.
pub fn pair_repulsion(delta: Vec3, strength: f32) -> Option<Vec3> {
    let dist_sq = delta.length_squared();
    let dir = delta.normalized()?;
    Some(dir * (strength / (dist_sq + SOFTENING)))
}

/// Spring force on the link source, pulling it toward `delta` (target minus
/// source) when stretched past `rest_length`. The target receives the negation.
pub fn spring_force(delta: Vec3, stiffness: f32, rest_length: f32) -> Option<Vec3> {
    let dist = delta.length();
    let dir = delta.normalized()?;
    Some(dir * (stiffness * (dist - rest_length)))
}

/// Baseline force-directed simulation.
pub struct ForceDirected {
    config: ForceDirectedConfig,
    rng: StdRng,
    settled: bool,
}

impl ForceDirected {
    /// Create the simulation, scattering unplaced nodes through the bounded cube.
    pub fn new(graph: &mut GraphState, config: ForceDirectedConfig, mut rng: StdRng) -> Self {
        let placed = graph.place_missing(&mut rng, |r| random_in_cube(r, SCATTER_EXTENT));
        debug!(placed, nodes = graph.node_count(), "force-directed layout initialised");
        Self {
            config,
            rng,
            settled: false,
        }
    }

    pub fn config(&self) -> &ForceDirectedConfig {
        &self.config
    }

    /// Reset and accumulate this step's forces into the graph's force buffer.
    fn accumulate_forces(&mut self, graph: &mut GraphState) {
        let cfg = &self.config;
        let rng = &mut self.rng;
        let buffers = graph.buffers_mut();
        let (positions, forces) = (&*buffers.positions, buffers.forces);
        let n = positions.len();

        forces.fill(Vec3::ZERO);

        for i in 0..n {
            for j in (i + 1)..n {
                let f = pair_repulsion(positions[i] - positions[j], cfg.repulsive_strength)
                    .unwrap_or_else(|| random_unit(rng) * (cfg.repulsive_strength / SOFTENING));
                forces[i] += f;
                forces[j] -= f;
            }
        }

        for link in buffers.links {
            if link.is_self_loop() {
                continue;
            }
            let (s, t) = (link.source.index(), link.target.index());
            let stiffness = cfg.attractive_strength * link.weight;
            let f = spring_force(positions[t] - positions[s], stiffness, cfg.link_distance)
                .unwrap_or_else(|| random_unit(rng) * (stiffness * cfg.link_distance));
            forces[s] += f;
            forces[t] -= f;
        }

        for i in 0..n {
            forces[i] -= positions[i] * cfg.centering_strength;
        }
    }

    /// Integrate accumulated forces. Returns the fastest node speed.
    fn integrate(&self, graph: &mut GraphState) -> f32 {
        let cfg = &self.config;
        let buffers = graph.buffers_mut();
        let mut max_speed = 0.0_f32;

        for i in 0..buffers.positions.len() {
            if buffers.states[i].is_pinned() {
                buffers.velocities[i] = Vec3::ZERO;
                continue;
            }
            let v = ((buffers.velocities[i] + buffers.forces[i] * cfg.integration_step)
                * cfg.damping_factor)
                .clamp_length(cfg.max_velocity);
            buffers.velocities[i] = v;
            buffers.positions[i] = (buffers.positions[i] + v).clamp_components(COORDINATE_BOUND);
            max_speed = max_speed.max(v.length());
        }
        max_speed
    }
}

impl Simulation for ForceDirected {
    fn step(&mut self, graph: &mut GraphState) -> bool {
        self.accumulate_forces(graph);
        let max_speed = self.integrate(graph);

        let running = max_speed > EQUILIBRIUM_SPEED;
        if running == self.settled {
            self.settled = !running;
            debug!(max_speed, settled = self.settled, "force-directed equilibrium changed");
        }
        running
    }
}
