//! The fixed set of layout algorithms, their keys and parameter tables.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::annealing::{self, AnnealingConfig, FruchtermanReingold};
use super::force_directed::{self, ForceDirected, ForceDirectedConfig};
use super::hierarchical::{self, Hierarchical, HierarchicalConfig};
use super::settings::{ParamSpec, Settings};
use super::spherical::{self, Spherical, SphericalConfig};
use super::Layout;
use crate::error::{Error, Result};
use crate::graph::GraphState;

/// Which layout algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    ForceDirected,
    FruchtermanReingold,
    Spherical,
    Hierarchical,
}

impl AlgorithmKind {
    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn spec(self) -> &'static AlgorithmSpec {
        let index = match self {
            AlgorithmKind::ForceDirected => 0,
            AlgorithmKind::FruchtermanReingold => 1,
            AlgorithmKind::Spherical => 2,
            AlgorithmKind::Hierarchical => 3,
        };
        &ALGORITHMS[index]
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AlgorithmKind {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self> {
        ALGORITHMS
            .iter()
            .find(|spec| spec.key == key)
            .map(|spec| spec.kind)
            .ok_or_else(|| Error::UnknownAlgorithm {
                key: key.to_string(),
            })
    }
}

type BuildFn = fn(&mut GraphState, &Settings) -> Result<Layout>;

/// Registry entry: what a UI needs to list an algorithm and render its sliders.
#[derive(Debug, Serialize)]
pub struct AlgorithmSpec {
    #[serde(skip)]
    pub kind: AlgorithmKind,
    pub key: &'static str,
    pub label: &'static str,
    pub params: &'static [ParamSpec],
    #[serde(skip)]
    build: BuildFn,
}

fn build_force_directed(graph: &mut GraphState, settings: &Settings) -> Result<Layout> {
    let config = ForceDirectedConfig::from_settings(settings)?;
    Ok(Layout::ForceDirected(ForceDirected::new(graph, config, settings.rng())))
}

fn build_annealing(graph: &mut GraphState, settings: &Settings) -> Result<Layout> {
    let config = AnnealingConfig::from_settings(settings)?;
    Ok(Layout::FruchtermanReingold(FruchtermanReingold::new(
        graph,
        config,
        settings.rng(),
    )))
}

fn build_spherical(graph: &mut GraphState, settings: &Settings) -> Result<Layout> {
    let config = SphericalConfig::from_settings(settings)?;
    Spherical::new(graph, config, settings.rng()).map(Layout::Spherical)
}

fn build_hierarchical(graph: &mut GraphState, settings: &Settings) -> Result<Layout> {
    let config = HierarchicalConfig::from_settings(settings)?;
    Ok(Layout::Hierarchical(Hierarchical::new(graph, config)))
}

pub static ALGORITHMS: [AlgorithmSpec; 4] = [
    AlgorithmSpec {
        kind: AlgorithmKind::ForceDirected,
        key: "force",
        label: "Force-directed",
        params: force_directed::PARAMS,
        build: build_force_directed,
    },
    AlgorithmSpec {
        kind: AlgorithmKind::FruchtermanReingold,
        key: "fruchterman-reingold",
        label: "Fruchterman-Reingold",
        params: annealing::PARAMS,
        build: build_annealing,
    },
    AlgorithmSpec {
        kind: AlgorithmKind::Spherical,
        key: "spherical",
        label: "Spherical layers",
        params: spherical::PARAMS,
        build: build_spherical,
    },
    AlgorithmSpec {
        kind: AlgorithmKind::Hierarchical,
        key: "hierarchical",
        label: "Hierarchical",
        params: hierarchical::PARAMS,
        build: build_hierarchical,
    },
];

/// Build `kind` over `graph`, resolving its parameters from `settings`.
pub fn create(kind: AlgorithmKind, graph: &mut GraphState, settings: &Settings) -> Result<Layout> {
    (kind.spec().build)(graph, settings)
}
