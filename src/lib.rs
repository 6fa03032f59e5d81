//! Event-driven straight-skeleton kernel for 2D simple polygons.
//!
//! The entry point is [`apply`], which runs a polygon's wavefront
//! simulation to completion and returns the resulting [`SkeletonResult`].
//! For reuse across many runs (e.g. in a benchmark loop) build a
//! [`Context`] directly and call [`Context::seed_polygon`] /
//! [`Context::run`] / [`Context::reset`] yourself.

mod context;
mod error;
mod event;
mod geom;
mod moving_node;
mod skeleton_graph;

pub use context::Context;
pub use error::SkeletonError;
pub use geom::{OrderedF64, Rect, determinant};
pub use moving_node::NodeId;
pub use skeleton_graph::{EdgeKind, SkelId, SkeletonGraph, SkeletonNode};

use nalgebra::Point2;

/// Tuning knobs for [`apply`] (§2 external interface).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonConfig {
    /// Target absolute offset distance. Negative shrinks, positive
    /// grows, `f64::NEG_INFINITY` shrinks to full collapse.
    /// `f64::INFINITY` is a contract violation (growing forever).
    pub distance: f64,
    /// Degeneracy tolerance for bisector/edge computations. Must be
    /// strictly positive.
    pub epsilon: f64,
}

impl Default for SkeletonConfig {
    /// Shrinks to full collapse with a tolerance suited to typical
    /// CAD-scale coordinates.
    fn default() -> Self {
        SkeletonConfig { distance: f64::NEG_INFINITY, epsilon: 1e-4 }
    }
}

/// The output of a completed simulation (§6 "External Interfaces").
#[derive(Debug)]
pub struct SkeletonResult {
    graph: SkeletonGraph,
    start_nodes: Vec<SkelId>,
    node_loops: Vec<Vec<SkelId>>,
}

impl SkeletonResult {
    /// The `SkeletonNode`s corresponding 1-to-1 to the input vertices, in
    /// input order.
    pub fn start_nodes(&self) -> &[SkelId] {
        &self.start_nodes
    }

    /// Every ring still alive when the simulation stopped (normally
    /// empty for a full collapse), each as the sequence of `SkelId`s
    /// currently held by its wavefront.
    pub fn node_loops(&self) -> &[Vec<SkelId>] {
        &self.node_loops
    }

    /// The final resting position of `id`.
    pub fn position_of(&self, id: SkelId) -> Point2<f64> {
        self.graph.node(id).p
    }

    /// The full output graph: mapping edges trace each input vertex's
    /// path; degeneracy edges connect vertices absorbed when the
    /// wavefront pinched.
    pub fn graph(&self) -> &SkeletonGraph {
        &self.graph
    }
}

/// Runs the straight-skeleton simulation for `polygon` (a simple,
/// counter-clockwise-wound ring of vertices) to completion.
///
/// # Errors
///
/// Returns [`SkeletonError`] if the input contract is violated: fewer
/// than 3 vertices, a non-finite vertex, a non-positive `epsilon`, or a
/// `distance` of `f64::INFINITY` (growing forever is not representable).
pub fn apply(polygon: &[Point2<f64>], config: SkeletonConfig) -> Result<SkeletonResult, SkeletonError> {
    if polygon.len() < 3 {
        return Err(SkeletonError::TooFewVertices(polygon.len()));
    }
    for (i, p) in polygon.iter().enumerate() {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(SkeletonError::NonFiniteVertex(i));
        }
    }
    if !(config.epsilon > 0.0) {
        return Err(SkeletonError::NonPositiveEpsilon(config.epsilon));
    }
    if config.distance == f64::INFINITY {
        return Err(SkeletonError::InfiniteGrowDistance);
    }

    let distance_sign = if config.distance < 0.0 { -1.0 } else { 1.0 };
    let target_distance = if config.distance == f64::NEG_INFINITY {
        let mut bbox = Rect::default();
        for &p in polygon {
            bbox.union(p);
        }
        // Half the bounding diagonal, plus a margin, safely bounds the
        // time any point in the polygon needs to fully collapse.
        0.51 * bbox.diagonal()
    } else {
        config.distance.abs()
    };

    let mut ctx = Context::new(config.epsilon);
    ctx.reset(target_distance, distance_sign);
    let start_nodes = ctx.seed_polygon(polygon);
    ctx.run();

    let node_loops = ctx.live_rings();
    Ok(SkeletonResult { graph: ctx.into_graph(), start_nodes, node_loops })
}
