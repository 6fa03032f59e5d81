//! The output planar graph (§3 "SkeletonNode (output graph vertex)").
//!
//! Nodes are allocated from a flat arena and referenced by a stable
//! [`SkelId`], never destroyed for the lifetime of a `Context` (matching
//! the "arena + stable indices" design note in §9 of the spec).

use std::collections::HashMap;

use nalgebra::{Point2, Vector2};

/// Stable index into a [`SkeletonGraph`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SkelId(pub(crate) usize);

/// The kind of a directed edge in the output graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Continues the trace of an initial boundary vertex.
    Mapping,
    /// Internal connector produced when the wavefront pinches.
    Degeneracy,
}

#[derive(Debug, Clone)]
pub struct SkeletonNode {
    /// Position where this node was laid down.
    pub p: Point2<f64>,
    /// `true` iff the moving vertex that created this node was reflex at
    /// the time it was laid down.
    pub reflex: bool,
    pub(crate) outgoing: HashMap<SkelId, EdgeKind>,
    pub(crate) incoming: HashMap<SkelId, EdgeKind>,
}

impl SkeletonNode {
    fn new(p: Point2<f64>) -> Self {
        SkeletonNode {
            p,
            reflex: false,
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    pub fn outgoing(&self) -> impl Iterator<Item = (SkelId, EdgeKind)> + '_ {
        self.outgoing.iter().map(|(&k, &v)| (k, v))
    }

    pub fn incoming(&self) -> impl Iterator<Item = (SkelId, EdgeKind)> + '_ {
        self.incoming.iter().map(|(&k, &v)| (k, v))
    }
}

/// Append-only (except for [`SkeletonGraph::remap_incoming`]) planar
/// graph of [`SkeletonNode`]s.
#[derive(Debug, Default)]
pub struct SkeletonGraph {
    nodes: Vec<SkeletonNode>,
}

impl SkeletonGraph {
    pub fn new() -> Self {
        SkeletonGraph { nodes: Vec::new() }
    }

    pub fn alloc(&mut self, p: Point2<f64>) -> SkelId {
        let id = SkelId(self.nodes.len());
        self.nodes.push(SkeletonNode::new(p));
        id
    }

    pub fn node(&self, id: SkelId) -> &SkeletonNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every id currently allocated, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = SkelId> {
        (0..self.nodes.len()).map(SkelId)
    }

    /// Adds a directed edge `from -> to` of kind `kind`. Maintains the
    /// symmetry invariant `outgoing[to] = K <=> incoming[from] = K`.
    pub fn add_edge(&mut self, from: SkelId, to: SkelId, kind: EdgeKind) {
        self.nodes[from.0].outgoing.insert(to, kind);
        self.nodes[to.0].incoming.insert(from, kind);
    }

    /// Marks `id` as having been laid down by a reflex vertex (§4.4, both
    /// `EdgeEvent` and `SplitEvent` do this for the surviving node).
    pub fn mark_reflex(&mut self, id: SkelId) {
        self.nodes[id.0].reflex = true;
    }

    /// Translates `id`'s position in place by `delta`. Used by the main
    /// loop's `advance` step while `id` is still the live skeleton node of
    /// a moving vertex — a new node is allocated instead whenever the
    /// vertex changes direction (see `MovingNodeArena::leave_skeleton_node`).
    pub fn translate(&mut self, id: SkelId, delta: Vector2<f64>) {
        self.nodes[id.0].p += delta;
    }

    /// Atomically redirects every incoming edge of `old` to point at
    /// `new` instead, used when two moving vertices merge at an
    /// `EdgeEvent` (§4.4). `old` keeps whatever outgoing edges it had
    /// (none, in practice, since it is about to be retired).
    pub fn remap_incoming(&mut self, old: SkelId, new: SkelId) {
        if old == new {
            return;
        }
        let incoming = std::mem::take(&mut self.nodes[old.0].incoming);
        for (from, kind) in incoming {
            self.nodes[from.0].outgoing.remove(&old);
            self.nodes[from.0].outgoing.insert(new, kind);
            self.nodes[new.0].incoming.insert(from, kind);
        }
    }
}
