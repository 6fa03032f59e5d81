//! Event data and geometry (§3 "Event (abstract)", §4.3).
//!
//! The two concrete event kinds are modelled as a tagged variant
//! ([`EventData`]) rather than trait objects, per the design note in
//! `spec.md` §9 ("do not emulate virtual dispatch with heap pointers").
//! Dispatch on the variant (`handle`) lives in [`crate::context`], which
//! is the only place that holds both arenas mutably at once.

use nalgebra::Point2;

use crate::geom::{OrderedF64, determinant};
use crate::moving_node::{MovingNodeArena, NodeId};
use crate::skeleton_graph::SkeletonGraph;

/// Breaks time ties: an `EdgeEvent` at the same instant as a `SplitEvent`
/// must be handled first (§4.5), so `Edge` sorts before `Split`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    Edge = 0,
    Split = 1,
}

/// The total order used by the event queue: `time` ascending, then
/// `kind`, then a monotonically issued `serial` as the final,
/// deterministic tie-break (§9 "Deterministic tie-breaking" — replacing
/// the source's reliance on object hash).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKey {
    pub time: OrderedF64,
    pub kind: EventKind,
    pub serial: u64,
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.time, self.kind, self.serial).cmp(&(other.time, other.kind, other.serial))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum EventData {
    /// The edge `(n0, n0.next)` collapses.
    Edge { n0: NodeId, n1: NodeId },
    /// `reflex` meets the directed edge `(op0, op1)`, `op0.next == op1`.
    Split {
        reflex: NodeId,
        op0: NodeId,
        op1: NodeId,
    },
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub key: EventKey,
    pub data: EventData,
}

impl EventRecord {
    /// The node ids this event references, for O(deg) back-reference
    /// bookkeeping (§5).
    pub fn participants(&self) -> Vec<NodeId> {
        match self.data {
            EventData::Edge { n0, n1 } => vec![n0, n1],
            EventData::Split { reflex, op0, op1 } => vec![reflex, op0, op1],
        }
    }
}

/// §4.3 SplitEvent time for `reflex` against the directed edge
/// `(a, b)` where `b == a.next`. Returns `None` if the candidate fails
/// any of the geometric preconditions (`canHit`) or is diverging.
pub fn split_candidate_time(
    arena: &MovingNodeArena,
    graph: &SkeletonGraph,
    distance_sign: f64,
    reflex: NodeId,
    a: NodeId,
    b: NodeId,
) -> Option<f64> {
    let r_bisector = arena.get(reflex).bisector;
    let a_edge_dir = arena.get(a).edge_dir;
    // The opposite edge itself advances at unit speed; its contribution
    // flips sign with the simulation direction.
    let approach_speed = determinant(r_bisector, a_edge_dir) + (-distance_sign);

    let p_r = graph.node(arena.get(reflex).skel_node).p;
    let p_a = graph.node(arena.get(a).skel_node).p;
    let side_distance = determinant(p_r - p_a, a_edge_dir);

    let t = if side_distance == 0.0 {
        0.0
    } else {
        let corrected_speed = if side_distance > 0.0 {
            -approach_speed
        } else {
            approach_speed
        };
        if corrected_speed <= 0.0 {
            return None;
        }
        -side_distance / approach_speed
    };

    if can_hit(arena, graph, distance_sign, reflex, a, b, t) {
        Some(t)
    } else {
        None
    }
}

/// §4.3 `canHit`: validates a split candidate at the moment it is
/// *created*, so rejected candidates never enter the queue.
fn can_hit(
    arena: &MovingNodeArena,
    graph: &SkeletonGraph,
    distance_sign: f64,
    reflex: NodeId,
    a: NodeId,
    b: NodeId,
    t: f64,
) -> bool {
    // The opposite edge must not collapse before the split. A NaN
    // `edge_collapse_time` (a non-shrinking edge) makes this comparison
    // false by IEEE-754 semantics, which is the literal precondition
    // this spec was distilled from — reproduced as-is rather than
    // "fixed", per the instruction to match existing behavior.
    let a_collapse = arena.get(a).edge_collapse_time;
    if !(t < a_collapse) {
        return false;
    }

    let p_r = graph.node(arena.get(reflex).skel_node).p;
    let r_bisector = arena.get(reflex).bisector;
    let r_future: Point2<f64> = p_r + r_bisector * t;

    let p_a = graph.node(arena.get(a).skel_node).p;
    let p_b = graph.node(arena.get(b).skel_node).p;
    let a_bisector = arena.get(a).bisector;
    let b_bisector = arena.get(b).bisector;

    let inside_a = determinant(a_bisector, r_future - p_a) * distance_sign >= 0.0;
    let inside_b = determinant(b_bisector, r_future - p_b) * distance_sign <= 0.0;

    inside_a && inside_b
}
