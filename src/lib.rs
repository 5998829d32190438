//! Constellation Layout - WASM Module
//!
//! Iterative 3D layout engine for node-link graphs. A host (usually a
//! WebGL/three.js render loop) builds a graph from ingested records, selects
//! an algorithm by key and calls `step()` once per animation frame, reading
//! the updated positions back after each call.
//!
//! # Architecture
//!
//! - `graph`: node/link arena on petgraph's StableGraph with SoA position buffers
//! - `layout`: the four algorithms, their parameter tables and the registry
//! - `session`: owns the graph across algorithm switches, drives render hooks
//! - `math`: `Vec3` and the random/geometric helpers the algorithms share
//! - `error`: the crate error type

use js_sys::Float32Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod graph;
pub mod layout;
pub mod math;
pub mod session;

pub use error::{Error, Result};
pub use graph::{Bounds3, GraphState, LinkRecord, NodeId, NodeRecord};
pub use layout::{ALGORITHMS, AlgorithmKind, Layout, ParamSpec, Settings, Simulation};
pub use math::Vec3;
pub use session::{Continuity, LayoutSession, RenderHost};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> std::result::Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsError::new(&e.to_string()))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> std::result::Result<T, JsError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsError::new(&e.to_string()))
}

/// Main entry point for the layout engine.
///
/// Wraps a [`LayoutSession`] and exposes it to JavaScript.
#[wasm_bindgen]
pub struct ConstellationWasm {
    session: LayoutSession,
}

#[wasm_bindgen]
impl ConstellationWasm {
    /// Build the graph from arrays of node records (`{id, label?, position?, size?, group?}`)
    /// and link records (`{source, target, weight?}`).
    ///
    /// Links with unknown endpoints are dropped; `strict` rejects them instead,
    /// along with duplicate node ids.
    #[wasm_bindgen(constructor)]
    pub fn new(
        nodes: JsValue,
        links: JsValue,
        strict: Option<bool>,
    ) -> std::result::Result<ConstellationWasm, JsError> {
        let nodes: Vec<NodeRecord> = from_js(nodes)?;
        let links: Vec<LinkRecord> = from_js(links)?;
        let graph = if strict.unwrap_or(false) {
            GraphState::try_from_records(&nodes, &links)?
        } else {
            GraphState::from_records(&nodes, &links)
        };
        Ok(Self {
            session: LayoutSession::new(graph),
        })
    }

    /// Registry listing: key, label and parameter table per algorithm.
    pub fn algorithms() -> std::result::Result<JsValue, JsError> {
        to_js(&ALGORITHMS)
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Switch to the algorithm registered under `key`.
    ///
    /// `settings` is a flat object of parameter values (plus `seed`/`hub`);
    /// `undefined` uses the defaults. With `preserve` the current positions
    /// carry over; otherwise every node is scattered afresh.
    #[wasm_bindgen(js_name = selectAlgorithm)]
    pub fn select_algorithm(
        &mut self,
        key: &str,
        settings: JsValue,
        preserve: bool,
    ) -> std::result::Result<(), JsError> {
        let kind: AlgorithmKind = key.parse()?;
        let settings: Settings = if settings.is_undefined() || settings.is_null() {
            Settings::default()
        } else {
            from_js(settings)?
        };
        let continuity = if preserve {
            Continuity::Preserve
        } else {
            Continuity::Reset
        };
        self.session.select(kind, &settings, continuity)?;
        Ok(())
    }

    /// Key of the active algorithm, if any.
    #[wasm_bindgen(js_name = activeAlgorithm)]
    pub fn active_algorithm(&self) -> Option<String> {
        self.session.active_kind().map(|k| k.key().to_string())
    }

    /// Advance one step. Returns `false` once the layout has settled.
    pub fn step(&mut self) -> bool {
        self.session.step()
    }

    // =========================================================================
    // Node Access
    // =========================================================================

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.session.graph().node_count() as u32
    }

    #[wasm_bindgen(js_name = linkCount)]
    pub fn link_count(&self) -> u32 {
        self.session.graph().link_count() as u32
    }

    /// Slot of a node id, as used by the position buffer.
    #[wasm_bindgen(js_name = nodeIndex)]
    pub fn node_index(&self, id: &str) -> Option<u32> {
        self.session.graph().lookup(id).map(|n| n.0)
    }

    /// Positions as `[x0, y0, z0, x1, y1, z1, ...]`, in node slot order.
    #[wasm_bindgen(js_name = getPositions)]
    pub fn get_positions(&self) -> Float32Array {
        Float32Array::from(&self.session.graph().flat_positions()[..])
    }

    /// Bounding box of placed nodes (`{min, max}`), or `undefined`.
    #[wasm_bindgen(js_name = getBounds)]
    pub fn get_bounds(&self) -> std::result::Result<JsValue, JsError> {
        match self.session.graph().bounds() {
            Some(bounds) => to_js(&bounds),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Move a node, e.g. while the user drags it.
    ///
    /// Returns `false` for unknown ids and NaN or infinite coordinates.
    #[wasm_bindgen(js_name = setNodePosition)]
    pub fn set_node_position(&mut self, id: &str, x: f32, y: f32, z: f32) -> bool {
        self.session.graph_mut().move_node(id, Vec3::new(x, y, z))
    }

    /// Hold a node in place under the physical simulations.
    #[wasm_bindgen(js_name = pinNode)]
    pub fn pin_node(&mut self, id: &str) -> bool {
        let graph = self.session.graph_mut();
        graph.lookup(id).map(|node| graph.pin(node)).is_some()
    }

    #[wasm_bindgen(js_name = unpinNode)]
    pub fn unpin_node(&mut self, id: &str) -> bool {
        let graph = self.session.graph_mut();
        graph.lookup(id).map(|node| graph.unpin(node)).is_some()
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Two loose clusters joined by one bridge link.
    fn clusters(size: usize) -> (Vec<NodeRecord>, Vec<LinkRecord>) {
        let mut nodes = Vec::new();
        let mut links = Vec::new();
        for cluster in ["a", "b"] {
            for i in 0..size {
                nodes.push(NodeRecord::new(format!("{cluster}{i}")));
                if i > 0 {
                    links.push(LinkRecord::new(format!("{cluster}0"), format!("{cluster}{i}")));
                }
            }
        }
        links.push(LinkRecord::new("a0", "b0"));
        (nodes, links)
    }

    fn session(size: usize) -> LayoutSession {
        let (nodes, links) = clusters(size);
        LayoutSession::new(GraphState::try_from_records(&nodes, &links).unwrap())
    }

    #[test]
    fn test_force_directed_run_settles() {
        let mut session = session(6);
        let settings = Settings::new().with_seed(9);
        session
            .select(AlgorithmKind::ForceDirected, &settings, Continuity::Reset)
            .unwrap();

        let mut steps = 0;
        while session.step() {
            steps += 1;
            assert!(steps < 5000, "force-directed layout never settled");
        }
        println!("force-directed settled after {steps} steps");

        let graph = session.graph();
        let a0 = graph.lookup("a0").unwrap();
        let b0 = graph.lookup("b0").unwrap();
        let bridge = (graph.position(a0) - graph.position(b0)).length();
        assert!(bridge.is_finite() && bridge > 1.0);
    }

    #[test]
    fn test_annealing_run_exhausts_budget() {
        let mut session = session(5);
        let settings = Settings::new().with_seed(4).with("maxIterations", 50.0);
        session
            .select(AlgorithmKind::FruchtermanReingold, &settings, Continuity::Reset)
            .unwrap();

        let mut steps = 0;
        while session.step() {
            steps += 1;
        }
        assert_eq!(steps, 49);
        assert!(!session.step(), "stays finished");
        assert!(session.graph().positions().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_switching_algorithms_keeps_picture() {
        let mut session = session(4);
        let settings = Settings::new().with_seed(1);
        session
            .select(AlgorithmKind::ForceDirected, &settings, Continuity::Reset)
            .unwrap();
        for _ in 0..30 {
            session.step();
        }

        for key in ["fruchterman-reingold", "spherical", "hierarchical"] {
            let kind: AlgorithmKind = key.parse().unwrap();
            let before = session.graph().flat_positions();
            session.select(kind, &settings, Continuity::Preserve).unwrap();
            assert_eq!(session.graph().flat_positions(), before, "{key} moved nodes on select");
            assert_eq!(session.active_kind(), Some(kind));
            assert!(session.step(), "{key} stopped on its first step");
        }
    }

    #[test]
    fn test_structural_layouts_run_forever() {
        for kind in [AlgorithmKind::Spherical, AlgorithmKind::Hierarchical] {
            let mut session = session(5);
            session
                .select(kind, &Settings::new().with_seed(2), Continuity::Reset)
                .unwrap();
            for _ in 0..1000 {
                assert!(session.step(), "{kind} reported equilibrium");
            }
            assert_eq!(session.steps(), 1000);
        }
    }

    #[test]
    fn test_seeded_runs_reproducible() {
        let run = || {
            let mut session = session(5);
            session
                .select(
                    AlgorithmKind::ForceDirected,
                    &Settings::new().with_seed(77),
                    Continuity::Reset,
                )
                .unwrap();
            for _ in 0..25 {
                session.step();
            }
            session.graph().flat_positions()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_settings_from_json() {
        let settings: Settings =
            serde_json::from_str(r#"{"hub": "b0", "layerSpacing": 100, "seed": 3}"#).unwrap();
        let mut session = session(4);
        session
            .select(AlgorithmKind::Spherical, &settings, Continuity::Reset)
            .unwrap();
        for _ in 0..2000 {
            session.step();
        }

        let graph = session.graph();
        let hub = graph.position(graph.lookup("b0").unwrap());
        assert!(hub.length() < 1.0, "hub drifted to {hub:?}");
        // a1 is two hops from b0, so it rides the second shell.
        let a1 = graph.position(graph.lookup("a1").unwrap()).length();
        assert!((a1 - 200.0).abs() < 5.0, "a1 at radius {a1}");
    }

    #[test]
    fn test_strict_ingestion_rejects_dangling_link() {
        let (nodes, mut links) = clusters(3);
        links.push(LinkRecord::new("a1", "ghost"));
        let err = GraphState::try_from_records(&nodes, &links).err();
        assert!(matches!(err, Some(Error::UnresolvedLink { .. })));

        let lenient = GraphState::from_records(&nodes, &links);
        assert_eq!(lenient.skipped_links(), 1);
        assert_eq!(lenient.link_count(), links.len() - 1);
    }

    #[test]
    fn test_loads_crawler_network_export() {
        #[derive(serde::Deserialize)]
        struct Network {
            nodes: Vec<NodeRecord>,
            links: Vec<LinkRecord>,
        }

        let json = r#"{
            "nodes": [
                {"id": "hub", "label": "Hub", "group": 0, "size": 15,
                 "accessibility": "accessible", "accessible": true,
                 "participants": 900, "messages_count": 40, "depth": 0},
                {"id": "mirror", "label": "Mirror", "group": 1, "size": 10,
                 "accessibility": "failed", "accessible": false,
                 "participants": 0, "messages_count": 0, "depth": 1},
                {"id": "ref", "label": "ref", "group": 2, "size": 8,
                 "accessibility": "referenced", "accessible": false,
                 "participants": 0, "messages_count": 0, "depth": 2}
            ],
            "links": [
                {"source": "hub", "target": "mirror", "value": 1},
                {"source": "hub", "target": "ref", "value": 2}
            ]
        }"#;
        let network: Network = serde_json::from_str(json).unwrap();
        let graph = GraphState::try_from_records(&network.nodes, &network.links).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.links()[1].weight, 2.0);

        let mirror = graph.attributes(graph.lookup("mirror").unwrap());
        assert_eq!(mirror.group, Some(graph::NodeGroup::Index(1)));
        assert_eq!(mirror.label.as_deref(), Some("Mirror"));

        let mut session = LayoutSession::new(graph);
        session
            .select(AlgorithmKind::Spherical, &Settings::new().with_seed(5), Continuity::Reset)
            .unwrap();
        assert!(session.step());
    }
}
