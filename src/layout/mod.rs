//! Layout algorithms.
//!
//! Every algorithm borrows the shared [`GraphState`] for one `step()` at a
//! time, mutating positions and velocities in place. The physical
//! simulations (force-directed, annealing) settle and report it; the
//! structural ones (spherical, hierarchical) keep moving forever.

pub mod annealing;
pub mod force_directed;
pub mod hierarchical;
pub mod registry;
pub mod settings;
pub mod spherical;

pub use annealing::{AnnealingConfig, FruchtermanReingold};
pub use force_directed::{ForceDirected, ForceDirectedConfig};
pub use hierarchical::{Hierarchical, HierarchicalConfig};
pub use registry::{ALGORITHMS, AlgorithmKind, AlgorithmSpec, create};
pub use settings::{ParamSpec, Settings};
pub use spherical::{Spherical, SphericalConfig};

use crate::graph::GraphState;

/// One animation tick of a layout.
pub trait Simulation {
    /// Advance by one step. Returns `false` once settled or out of budget;
    /// calling again after that is harmless.
    fn step(&mut self, graph: &mut GraphState) -> bool;
}

/// A running layout, one variant per algorithm.
pub enum Layout {
    ForceDirected(ForceDirected),
    FruchtermanReingold(FruchtermanReingold),
    Spherical(Spherical),
    Hierarchical(Hierarchical),
}

impl Layout {
    pub fn kind(&self) -> AlgorithmKind {
        match self {
            Layout::ForceDirected(_) => AlgorithmKind::ForceDirected,
            Layout::FruchtermanReingold(_) => AlgorithmKind::FruchtermanReingold,
            Layout::Spherical(_) => AlgorithmKind::Spherical,
            Layout::Hierarchical(_) => AlgorithmKind::Hierarchical,
        }
    }
}

impl Simulation for Layout {
    fn step(&mut self, graph: &mut GraphState) -> bool {
        match self {
            Layout::ForceDirected(sim) => sim.step(graph),
            Layout::FruchtermanReingold(sim) => sim.step(graph),
            Layout::Spherical(sim) => sim.step(graph),
            Layout::Hierarchical(sim) => sim.step(graph),
        }
    }
}
