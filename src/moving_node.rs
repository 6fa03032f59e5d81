//! The moving wavefront (§3 "MovingNode (wavefront vertex)", §4.2).
//!
//! `MovingNodeArena` is a flat arena of `MovingNode`s addressed by a
//! stable [`NodeId`]; live nodes form one or more circular doubly-linked
//! rings (the arena itself is loop-agnostic, see `SPEC_FULL.md` §C.1).
//! Tombstones (`alive: false`) are left in place on removal so that ids
//! referenced by in-flight events never dangle or get reused.

use nalgebra::{Point2, Vector2};
use tracing::trace;

use crate::event::EventKey;
use crate::geom::{determinant, safe_normalize};
use crate::skeleton_graph::{EdgeKind, SkelId, SkeletonGraph};

/// Stable index into a [`MovingNodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct MovingNode {
    pub id: NodeId,
    pub skel_node: SkelId,
    pub next: NodeId,
    pub prev: NodeId,
    /// Unit vector from `skel_node.p` to `next`'s `skel_node.p`. Stale
    /// between `leave_skeleton_node` and the next `update_edge`.
    pub edge_dir: Vector2<f64>,
    /// Time until edge `(self, next)` collapses to zero length, or NaN
    /// if the edge is non-shrinking.
    pub edge_collapse_time: f64,
    /// Direction x speed this vertex moves at.
    pub bisector: Vector2<f64>,
    /// `true` iff this vertex is a concave (reflex) corner.
    pub reflex: bool,
    /// Back-references to every event in the queue that names this node,
    /// kept in sync so an abort can drop all of a node's events in
    /// O(deg) without scanning the whole queue.
    pub events: Vec<EventKey>,
    alive: bool,
}

/// Outcome of [`MovingNodeArena::calc_bisector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BisectorOutcome {
    Ok,
    /// The corner degenerated (zero-length incident edge, vanishing
    /// `sin`, or a two-node ring); `bisector` was zeroed and `reflex`
    /// cleared.
    Degenerate,
}

#[derive(Debug, Default)]
pub struct MovingNodeArena {
    nodes: Vec<Option<MovingNode>>,
}

impl MovingNodeArena {
    pub fn new() -> Self {
        MovingNodeArena { nodes: Vec::new() }
    }

    /// Allocates a fresh node, self-linked (its own `next`/`prev`); the
    /// caller must link it into a ring before it is simulated.
    pub fn alloc(&mut self, skel_node: SkelId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(MovingNode {
            id,
            skel_node,
            next: id,
            prev: id,
            edge_dir: Vector2::new(0.0, 0.0),
            edge_collapse_time: f64::NAN,
            bisector: Vector2::new(0.0, 0.0),
            reflex: false,
            events: Vec::new(),
            alive: true,
        }));
        id
    }

    pub fn get(&self, id: NodeId) -> &MovingNode {
        self.nodes[id.0].as_ref().expect("access to removed MovingNode")
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut MovingNode {
        self.nodes[id.0].as_mut().expect("access to removed MovingNode")
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes[id.0].as_ref().is_some_and(|n| n.alive)
    }

    /// Links `a -> b`: `a.next = b`, `b.prev = a`. This and `splice_out`
    /// are the only operations that mutate ring topology, mirroring the
    /// teacher crate's convention that `link`/`join_polygons` are the
    /// sole mutators of its circular list (see `polygon.rs::EarClip::link`).
    pub fn link(&mut self, a: NodeId, b: NodeId) {
        self.get_mut(a).next = b;
        self.get_mut(b).prev = a;
    }

    /// `true` iff the ring containing `id` currently holds exactly two
    /// live nodes.
    pub fn is_pair(&self, id: NodeId) -> bool {
        let n = self.get(id).next;
        self.get(n).next == id && n != id
    }

    /// Marks `id` dead. Callers must have already relinked its
    /// neighbours; the node's own `next`/`prev` are left as-is for
    /// debugging but must not be traversed afterwards.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(n) = self.nodes[id.0].as_mut() {
            n.alive = false;
        }
    }

    fn position(&self, graph: &SkeletonGraph, id: NodeId) -> Point2<f64> {
        graph.node(self.get(id).skel_node).p
    }

    /// §4.2 `calcBisector`. Computes the vertex's bisector from its two
    /// incident edge directions. `distance_sign` is +1 to grow, -1 to
    /// shrink; `epsilon` is the degeneracy tolerance.
    pub fn calc_bisector(
        &mut self,
        id: NodeId,
        graph: &SkeletonGraph,
        distance_sign: f64,
        epsilon: f64,
    ) -> BisectorOutcome {
        if self.is_pair(id) {
            return self.mark_degenerate(id);
        }

        let prev = self.get(id).prev;
        let next = self.get(id).next;
        let p_self = self.position(graph, id);
        let p_prev = self.position(graph, prev);
        let p_next = self.position(graph, next);

        let v_prev = p_prev - p_self;
        let v_next = p_next - p_self;
        if v_prev.norm() < epsilon || v_next.norm() < epsilon {
            return self.mark_degenerate(id);
        }

        let n_prev = v_prev.normalize();
        let n_next = v_next.normalize();
        let cos = n_prev.dot(&n_next);

        if cos < epsilon - 1.0 {
            // Near-180 degree corner: a flat edge moves perpendicular to
            // itself, independent of the angle bisector formula (which
            // would divide by ~0 here).
            let rotated = Vector2::new(-n_prev.y, n_prev.x);
            let node = self.get_mut(id);
            node.bisector = rotated * distance_sign;
            node.reflex = false;
            return BisectorOutcome::Ok;
        }

        let b = safe_normalize(n_prev + n_next);
        let sin = determinant(n_prev, b);
        if sin.abs() < epsilon {
            return self.mark_degenerate(id);
        }

        let speed = distance_sign / sin;
        let bisector = b * speed;
        let reflex = bisector.dot(&n_prev) < 0.0;

        // A commented-out stricter reflex-side sanity check existed in
        // the source this was ported from but was disabled because
        // enabling it broke grow operations; reproduced as disabled.
        // debug_assert!(reflex == (determinant(n_prev, n_next) < 0.0));

        let node = self.get_mut(id);
        node.bisector = bisector;
        node.reflex = reflex;
        BisectorOutcome::Ok
    }

    fn mark_degenerate(&mut self, id: NodeId) -> BisectorOutcome {
        trace!(node = id.0, "corner degenerated");
        let node = self.get_mut(id);
        node.bisector = Vector2::new(0.0, 0.0);
        node.reflex = false;
        BisectorOutcome::Degenerate
    }

    /// §4.2 `updateEdge`: recomputes `edge_dir` and `edge_collapse_time`
    /// for the edge `(id, id.next)`.
    pub fn update_edge(&mut self, id: NodeId, graph: &SkeletonGraph) {
        let next = self.get(id).next;
        let p_self = self.position(graph, id);
        let p_next = self.position(graph, next);
        let edge = p_next - p_self;
        let length = edge.norm();
        let edge_dir = safe_normalize(edge);

        let bisector_self = self.get(id).bisector;
        let bisector_next = self.get(next).bisector;
        let denom = bisector_self.dot(&edge_dir) - bisector_next.dot(&edge_dir);

        let collapse = if denom > 0.0 { length / denom } else { f64::NAN };

        let node = self.get_mut(id);
        node.edge_dir = edge_dir;
        node.edge_collapse_time = collapse;
    }

    /// §4.2 `leaveSkeletonNode`: allocates a new `SkeletonNode` at the
    /// vertex's current position, records a mapping edge from the old
    /// node to it, and installs the new one as `skel_node`.
    pub fn leave_skeleton_node(&mut self, id: NodeId, graph: &mut SkeletonGraph) {
        let old = self.get(id).skel_node;
        let new = graph.alloc(graph.node(old).p);
        graph.add_edge(old, new, EdgeKind::Mapping);
        self.get_mut(id).skel_node = new;
    }

    /// Iterates every live node id in arena order (not ring order).
    pub fn iter_alive(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter_map(|n| n.as_ref()).filter(|n| n.alive).map(|n| n.id)
    }

    /// Collects every live node id in the ring starting at `start`, in
    /// `next` order. Used by `Context::live_rings` and by callers that
    /// need a snapshot of a ring before mutating it.
    pub fn ring_ids_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut v = start;
        loop {
            out.push(v);
            v = self.get(v).next;
            if v == start {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(graph: &mut SkeletonGraph, arena: &mut MovingNodeArena, pts: &[(f64, f64)]) -> Vec<NodeId> {
        let ids: Vec<NodeId> = pts
            .iter()
            .map(|&(x, y)| arena.alloc(graph.alloc(Point2::new(x, y))))
            .collect();
        for i in 0..ids.len() {
            arena.link(ids[i], ids[(i + 1) % ids.len()]);
        }
        ids
    }

    #[test]
    fn calc_bisector_square_corner_is_45_degrees_inward() {
        let mut graph = SkeletonGraph::new();
        let mut arena = MovingNodeArena::new();
        // CCW square; check the bisector at (4,0).
        let ids = ring_of(&mut graph, &mut arena, &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let outcome = arena.calc_bisector(ids[1], &graph, -1.0, 1e-4);
        assert_eq!(outcome, BisectorOutcome::Ok);
        let b = arena.get(ids[1]).bisector;
        // Inward bisector at a square corner points along (-1,1)/sqrt(2) * sqrt(2)
        assert!((b.x - (-1.0)).abs() < 1e-9);
        assert!((b.y - 1.0).abs() < 1e-9);
        assert!(!arena.get(ids[1]).reflex);
    }

    #[test]
    fn calc_bisector_pair_ring_is_degenerate() {
        let mut graph = SkeletonGraph::new();
        let mut arena = MovingNodeArena::new();
        let a = arena.alloc(graph.alloc(Point2::new(0.0, 0.0)));
        let b = arena.alloc(graph.alloc(Point2::new(1.0, 0.0)));
        arena.link(a, b);
        arena.link(b, a);
        assert_eq!(
            arena.calc_bisector(a, &graph, -1.0, 1e-4),
            BisectorOutcome::Degenerate
        );
    }

    #[test]
    fn leave_skeleton_node_adds_mapping_edge() {
        let mut graph = SkeletonGraph::new();
        let mut arena = MovingNodeArena::new();
        let ids = ring_of(&mut graph, &mut arena, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        let old_skel = arena.get(ids[0]).skel_node;
        arena.leave_skeleton_node(ids[0], &mut graph);
        let new_skel = arena.get(ids[0]).skel_node;
        assert_ne!(old_skel, new_skel);
        assert_eq!(graph.node(old_skel).outgoing().next(), Some((new_skel, EdgeKind::Mapping)));
    }
}
