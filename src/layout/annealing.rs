//! Fruchterman-Reingold layout with a geometric cooling schedule.
//!
//! The optimal spacing is `k = ∛(volume / n)`. Each step:
//! - every pair repels with `k² / d`
//! - every link attracts with `weight · d² / k`
//! - a mild gravity pulls each node toward the origin in proportion to its distance
//! - each node moves along its net force, never farther than the current temperature
//! - coordinates past half the cube side are shrunk back softly instead of clamped
//! - the temperature is multiplied by `coolingRate`
//!
//! The run ends when the iteration budget is spent or the temperature drops
//! below [`MIN_TEMPERATURE`].

use rand::rngs::StdRng;
use tracing::debug;

use super::Simulation;
use super::settings::{ParamSpec, Settings};
use crate::error::Result;
use crate::graph::GraphState;
use crate::math::{Vec3, random_in_sphere, random_unit};

/// Temperature below which the layout counts as frozen.
pub const MIN_TEMPERATURE: f32 = 0.01;

/// Factor applied to a coordinate that strays past the soft bound.
pub const SOFT_BOUND_SHRINK: f32 = 0.98;

/// Added to squared distances before taking the root.
const SOFTENING: f32 = 0.01;

const VOLUME: ParamSpec = ParamSpec::new("volume", "Volume", 1e4, 1e8, 1e6, 1e4);
const INITIAL_TEMPERATURE: ParamSpec =
    ParamSpec::new("initialTemperature", "Initial temperature", 1.0, 500.0, 50.0, 1.0);
const COOLING_RATE: ParamSpec =
    ParamSpec::new("coolingRate", "Cooling rate", 0.8, 0.999, 0.95, 0.001);
const MAX_ITERATIONS: ParamSpec =
    ParamSpec::new("maxIterations", "Iterations", 10.0, 5000.0, 500.0, 10.0);
const GRAVITY: ParamSpec = ParamSpec::new("gravity", "Gravity", 0.0, 0.2, 0.01, 0.005);

pub const PARAMS: &[ParamSpec] = &[
    VOLUME,
    INITIAL_TEMPERATURE,
    COOLING_RATE,
    MAX_ITERATIONS,
    GRAVITY,
];

/// Resolved parameters for [`FruchtermanReingold`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingConfig {
    pub volume: f32,
    pub initial_temperature: f32,
    pub cooling_rate: f32,
    pub max_iterations: u32,
    pub gravity: f32,
}

impl AnnealingConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.report_unknown(PARAMS);
        Ok(Self {
            volume: settings.value(&VOLUME)? as f32,
            initial_temperature: settings.value(&INITIAL_TEMPERATURE)? as f32,
            cooling_rate: settings.value(&COOLING_RATE)? as f32,
            max_iterations: settings.value(&MAX_ITERATIONS)?.round() as u32,
            gravity: settings.value(&GRAVITY)? as f32,
        })
    }

    /// Half the side of the cube with this volume.
    pub fn half_extent(&self) -> f32 {
        self.volume.cbrt() * 0.5
    }
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            volume: VOLUME.default as f32,
            initial_temperature: INITIAL_TEMPERATURE.default as f32,
            cooling_rate: COOLING_RATE.default as f32,
            max_iterations: MAX_ITERATIONS.default as u32,
            gravity: GRAVITY.default as f32,
        }
    }
}

/// Repulsive force on the node at `delta` relative to its partner; the
/// partner receives the negation. `None` for coincident nodes.
pub fn pair_repulsion(delta: Vec3, optimal_distance: f32) -> Option<Vec3> {
    let dir = delta.normalized()?;
    let dist = (delta.length_squared() + SOFTENING).sqrt();
    Some(dir * (optimal_distance * optimal_distance / dist))
}

/// Attractive force on a link source toward its target at `delta`.
pub fn link_attraction(delta: Vec3, optimal_distance: f32) -> Option<Vec3> {
    let dir = delta.normalized()?;
    let dist_sq = delta.length_squared() + SOFTENING;
    Some(dir * (dist_sq / optimal_distance))
}

/// Fruchterman-Reingold simulation.
pub struct FruchtermanReingold {
    config: AnnealingConfig,
    optimal_distance: f32,
    temperature: f32,
    iteration: u32,
    rng: StdRng,
}

impl FruchtermanReingold {
    /// Create the simulation, scattering unplaced nodes inside the sphere
    /// inscribed in the configured volume.
    pub fn new(graph: &mut GraphState, config: AnnealingConfig, mut rng: StdRng) -> Self {
        let n = graph.node_count().max(1) as f32;
        let optimal_distance = (config.volume / n).cbrt();
        let half = config.half_extent();
        let placed = graph.place_missing(&mut rng, |r| random_in_sphere(r, half));
        debug!(placed, optimal_distance, "annealing layout initialised");

        Self {
            temperature: config.initial_temperature,
            config,
            optimal_distance,
            iteration: 0,
            rng,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn optimal_distance(&self) -> f32 {
        self.optimal_distance
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    fn exhausted(&self) -> bool {
        self.iteration >= self.config.max_iterations || self.temperature < MIN_TEMPERATURE
    }

    fn accumulate_forces(&mut self, graph: &mut GraphState) {
        let k = self.optimal_distance;
        let gravity = self.config.gravity;
        let rng = &mut self.rng;
        let buffers = graph.buffers_mut();
        let (positions, forces) = (&*buffers.positions, buffers.forces);
        let n = positions.len();

        forces.fill(Vec3::ZERO);

        for i in 0..n {
            for j in (i + 1)..n {
                let f = pair_repulsion(positions[i] - positions[j], k)
                    .unwrap_or_else(|| random_unit(rng) * (k * k / SOFTENING.sqrt()));
                forces[i] += f;
                forces[j] -= f;
            }
        }

        for link in buffers.links {
            if link.is_self_loop() {
                continue;
            }
            let (s, t) = (link.source.index(), link.target.index());
            // Coincident endpoints need no pull.
            if let Some(f) = link_attraction(positions[t] - positions[s], k) {
                let f = f * link.weight;
                forces[s] += f;
                forces[t] -= f;
            }
        }

        for i in 0..n {
            forces[i] -= positions[i] * gravity;
        }
    }

    fn displace(&self, graph: &mut GraphState) {
        let half = self.config.half_extent();
        let buffers = graph.buffers_mut();

        for i in 0..buffers.positions.len() {
            if buffers.states[i].is_pinned() {
                buffers.velocities[i] = Vec3::ZERO;
                continue;
            }
            let displacement = buffers.forces[i].clamp_length(self.temperature);
            let mut p = buffers.positions[i] + displacement;
            for c in [&mut p.x, &mut p.y, &mut p.z] {
                if c.abs() > half {
                    *c *= SOFT_BOUND_SHRINK;
                }
            }
            buffers.velocities[i] = p - buffers.positions[i];
            buffers.positions[i] = p;
        }
    }
}

impl Simulation for FruchtermanReingold {
    fn step(&mut self, graph: &mut GraphState) -> bool {
        if self.exhausted() {
            return false;
        }

        self.accumulate_forces(graph);
        self.displace(graph);
        self.temperature *= self.config.cooling_rate;
        self.iteration += 1;

        if self.exhausted() {
            debug!(
                iteration = self.iteration,
                temperature = self.temperature,
                "annealing schedule finished"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LinkRecord, NodeId, NodeRecord};
    use rand::SeedableRng;

    fn ring(count: usize) -> GraphState {
        let nodes: Vec<_> = (0..count).map(|i| NodeRecord::new(format!("n{i}"))).collect();
        let links: Vec<_> = (0..count)
            .map(|i| LinkRecord::new(format!("n{i}"), format!("n{}", (i + 1) % count)))
            .collect();
        GraphState::from_records(&nodes, &links)
    }

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(9)
    }

    #[test]
    fn test_optimal_distance() {
        let mut graph = ring(8);
        let config = AnnealingConfig {
            volume: 8000.0,
            ..Default::default()
        };
        let sim = FruchtermanReingold::new(&mut graph, config, seeded());
        // ∛(8000 / 8) = 10
        assert!((sim.optimal_distance() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_pair_forces_antisymmetric() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-4.0, 0.5, 9.0);
        assert_eq!(pair_repulsion(a - b, 12.0).unwrap(), -pair_repulsion(b - a, 12.0).unwrap());
        assert_eq!(
            link_attraction(a - b, 12.0).unwrap(),
            -link_attraction(b - a, 12.0).unwrap()
        );
    }

    #[test]
    fn test_coincident_nodes_separate() {
        let nodes = [NodeRecord::at("a", 2.0, 2.0, 2.0), NodeRecord::at("b", 2.0, 2.0, 2.0)];
        let links = [LinkRecord::new("a", "b")];
        let mut graph = GraphState::from_records(&nodes, &links);
        let mut sim = FruchtermanReingold::new(&mut graph, AnnealingConfig::default(), seeded());
        assert!(sim.step(&mut graph));

        let a = graph.position(NodeId(0));
        let b = graph.position(NodeId(1));
        assert!(a.is_finite() && b.is_finite());
        assert!((a - b).length() > 0.0, "coincident nodes must separate");
        assert!(graph.velocities().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_initial_scatter_inside_sphere() {
        let mut graph = ring(50);
        let config = AnnealingConfig::default();
        let half = config.half_extent();
        FruchtermanReingold::new(&mut graph, config, seeded());
        for p in graph.positions() {
            assert!(p.length() <= half + 1e-3);
        }
    }

    #[test]
    fn test_temperature_cools_geometrically() {
        let mut graph = ring(10);
        let mut sim = FruchtermanReingold::new(&mut graph, AnnealingConfig::default(), seeded());
        let rate = sim.config().cooling_rate;
        loop {
            let before = sim.temperature();
            let iteration = sim.iteration();
            let running = sim.step(&mut graph);
            assert_eq!(sim.iteration(), iteration + 1);
            assert_eq!(sim.temperature(), before * rate);
            assert!(sim.temperature() < before);
            if !running {
                break;
            }
        }
        // Frozen: further calls change nothing.
        let frozen = sim.temperature();
        assert!(!sim.step(&mut graph));
        assert_eq!(sim.temperature(), frozen);
    }

    #[test]
    fn test_displacement_bounded_by_temperature() {
        let mut graph = ring(20);
        let config = AnnealingConfig {
            initial_temperature: 5.0,
            ..Default::default()
        };
        let mut sim = FruchtermanReingold::new(&mut graph, config, seeded());
        for _ in 0..30 {
            let temperature = sim.temperature();
            let before: Vec<Vec3> = graph.positions().to_vec();
            sim.step(&mut graph);
            for (old, new) in before.iter().zip(graph.positions()) {
                // Soft bounding adds at most the shrink of the displaced point.
                let moved = (*new - *old).length();
                let shrink = (old.length() + temperature) * (1.0 - SOFT_BOUND_SHRINK);
                assert!(moved <= temperature + shrink + 1e-3);
            }
        }
    }

    #[test]
    fn test_terminates_on_iteration_budget() {
        let mut graph = ring(6);
        let config = AnnealingConfig {
            max_iterations: 25,
            cooling_rate: 0.999,
            ..Default::default()
        };
        let mut sim = FruchtermanReingold::new(&mut graph, config, seeded());
        let steps = (0..1000).take_while(|_| sim.step(&mut graph)).count();
        assert_eq!(steps, 24);
        assert_eq!(sim.iteration(), 25);
        assert!(!sim.step(&mut graph));
    }

    #[test]
    fn test_terminates_on_temperature() {
        let mut graph = ring(6);
        let config = AnnealingConfig {
            initial_temperature: 1.0,
            cooling_rate: 0.8,
            max_iterations: 5000,
            ..Default::default()
        };
        let mut sim = FruchtermanReingold::new(&mut graph, config, seeded());
        while sim.step(&mut graph) {}
        assert!(sim.temperature() < MIN_TEMPERATURE);
        assert!(sim.iteration() < 5000);
    }

    #[test]
    fn test_links_end_shorter_than_average_pair() {
        let mut graph = ring(30);
        let mut sim = FruchtermanReingold::new(&mut graph, AnnealingConfig::default(), seeded());
        while sim.step(&mut graph) {}

        let distance = |a: NodeId, b: NodeId| (graph.position(a) - graph.position(b)).length();
        let linked: f32 = graph
            .links()
            .iter()
            .map(|l| distance(l.source, l.target))
            .sum::<f32>()
            / graph.link_count() as f32;
        let (mut total, mut pairs) = (0.0_f32, 0usize);
        for i in 0..30u32 {
            for j in (i + 1)..30 {
                total += distance(NodeId(i), NodeId(j));
                pairs += 1;
            }
        }
        let average = total / pairs as f32;
        assert!(linked < average, "mean link {linked} vs mean pair {average}");
    }
}
