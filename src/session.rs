//! A layout session: one graph, one active algorithm at a time.
//!
//! The session owns the only copy of node positions. Switching algorithms
//! hands the same buffers to the new one, so a host can keep the picture
//! continuous or start over.

use tracing::info;

use crate::error::Result;
use crate::graph::{Bounds3, GraphState};
use crate::layout::{self, AlgorithmKind, Layout, Settings, Simulation};

/// What happens to existing positions when the algorithm changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuity {
    /// Keep positions and velocities; the new algorithm starts from the current picture.
    #[default]
    Preserve,
    /// Forget placement; the new algorithm scatters every node afresh.
    Reset,
}

/// Hooks a rendering host implements to follow the layout.
pub trait RenderHost {
    /// Read node positions after a step.
    fn sync_positions(&mut self, graph: &GraphState);

    /// Frame the camera on the given bounds.
    fn fit_camera(&mut self, bounds: Bounds3);
}

pub struct LayoutSession {
    graph: GraphState,
    layout: Option<Layout>,
    steps: u64,
}

impl LayoutSession {
    pub fn new(graph: GraphState) -> Self {
        Self {
            graph,
            layout: None,
            steps: 0,
        }
    }

    /// Replace the active algorithm.
    ///
    /// On error the previous algorithm stays active.
    pub fn select(
        &mut self,
        kind: AlgorithmKind,
        settings: &Settings,
        continuity: Continuity,
    ) -> Result<()> {
        let mut graph = match continuity {
            Continuity::Preserve => None,
            Continuity::Reset => Some(self.graph.clone()),
        };
        let target = match graph.as_mut() {
            Some(fresh) => {
                fresh.reset_placement();
                fresh
            }
            None => &mut self.graph,
        };
        let layout = layout::create(kind, target, settings)?;

        if let Some(fresh) = graph {
            self.graph = fresh;
        }
        info!(
            algorithm = %kind,
            ?continuity,
            nodes = self.graph.node_count(),
            links = self.graph.link_count(),
            "layout selected"
        );
        self.layout = Some(layout);
        self.steps = 0;
        Ok(())
    }

    /// Advance the active algorithm one step.
    ///
    /// `false` when settled or when nothing is selected.
    pub fn step(&mut self) -> bool {
        let Some(layout) = self.layout.as_mut() else {
            return false;
        };
        self.steps += 1;
        layout.step(&mut self.graph)
    }

    /// Step once and let the host pick up the new positions.
    pub fn tick(&mut self, host: &mut impl RenderHost) -> bool {
        let running = self.step();
        host.sync_positions(&self.graph);
        running
    }

    /// Point the host camera at the placed nodes. Does nothing when none are placed.
    pub fn fit_camera(&self, host: &mut impl RenderHost) {
        if let Some(bounds) = self.graph.bounds() {
            host.fit_camera(bounds);
        }
    }

    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    /// Direct access for pinning or dragging nodes between steps.
    pub fn graph_mut(&mut self) -> &mut GraphState {
        &mut self.graph
    }

    pub fn active_kind(&self) -> Option<AlgorithmKind> {
        self.layout.as_ref().map(Layout::kind)
    }

    /// Steps taken since the last [`select`](Self::select).
    pub fn steps(&self) -> u64 {
        self.steps
    }
}
