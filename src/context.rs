//! §4.5 Scheduler / Context: owns the moving-node arena, the ordered
//! event queue, the aborted-reflex set, and the main simulation loop.
//!
//! A `Context` is reusable across runs via [`Context::reset`] (§5 "a
//! Context must not be reused concurrently; distinct polygons may run
//! in parallel only with distinct Contexts").

use std::collections::{BTreeSet, HashSet};

use nalgebra::Point2;
use tracing::{debug_span, trace};

use crate::event::{EventData, EventKey, EventKind, EventRecord, split_candidate_time};
use crate::geom::{OrderedF64, reachable};
use crate::moving_node::{BisectorOutcome, MovingNodeArena, NodeId};
use crate::skeleton_graph::{EdgeKind, SkelId, SkeletonGraph};

#[derive(Debug)]
pub struct Context {
    pub graph: SkeletonGraph,
    pub(crate) arena: MovingNodeArena,
    queue: BTreeSet<EventKey>,
    events: Vec<Option<EventRecord>>,
    next_serial: u64,
    aborted_reflex: BTreeSet<NodeId>,
    split_events_enqueued: u64,
    pub time: f64,
    pub distance: f64,
    pub distance_sign: f64,
    pub epsilon: f64,
}

impl Context {
    pub fn new(epsilon: f64) -> Self {
        Context {
            graph: SkeletonGraph::new(),
            arena: MovingNodeArena::new(),
            queue: BTreeSet::new(),
            events: Vec::new(),
            next_serial: 0,
            aborted_reflex: BTreeSet::new(),
            split_events_enqueued: 0,
            time: 0.0,
            distance: 0.0,
            distance_sign: 1.0,
            epsilon,
        }
    }

    /// Total `SplitEvent`s ever pushed onto the queue over this
    /// Context's lifetime (since the last [`Context::reset`]). Used to
    /// check §8 properties 7-8 (convex and |P| <= 4 inputs never split).
    pub fn split_events_enqueued(&self) -> u64 {
        self.split_events_enqueued
    }

    /// §5 "`reset(distance, distanceSign)` clears all collections and
    /// restarts the id counter." `epsilon` is left untouched — it is a
    /// per-Context tolerance, not a per-run parameter.
    pub fn reset(&mut self, distance: f64, distance_sign: f64) {
        self.graph = SkeletonGraph::new();
        self.arena = MovingNodeArena::new();
        self.queue.clear();
        self.events.clear();
        self.next_serial = 0;
        self.aborted_reflex.clear();
        self.split_events_enqueued = 0;
        self.time = 0.0;
        self.distance = distance;
        self.distance_sign = distance_sign;
    }

    /// Builds the initial moving-node ring and skeleton nodes for
    /// `points` (one-to-one, order preserved), computes the initial
    /// bisectors, and seeds the event queue. Returns the start
    /// `SkelId`s (§6 "startNodes").
    pub fn seed_polygon(&mut self, points: &[Point2<f64>]) -> Vec<SkelId> {
        let skel_ids: Vec<SkelId> = points.iter().map(|&p| self.graph.alloc(p)).collect();
        let node_ids: Vec<NodeId> = skel_ids.iter().map(|&s| self.arena.alloc(s)).collect();
        let n = node_ids.len();
        for i in 0..n {
            self.arena.link(node_ids[i], node_ids[(i + 1) % n]);
        }

        // Initial bisector pass. A degenerate initial corner is absorbed
        // exactly like a mid-simulation one (§4.6), except no fresh
        // skeleton node is allocated — these nodes *are* the fresh ones.
        for &id in &node_ids {
            if !self.arena.is_alive(id) {
                continue;
            }
            let mut cur = id;
            loop {
                if self.arena.is_pair(cur) {
                    let other = self.arena.get(cur).next;
                    self.finish_pair(cur, other);
                    break;
                }
                match self.arena.calc_bisector(cur, &self.graph, self.distance_sign, self.epsilon) {
                    BisectorOutcome::Ok => break,
                    BisectorOutcome::Degenerate => cur = self.handle_degenerate_angle(cur),
                }
            }
        }

        for &id in &node_ids {
            if self.arena.is_alive(id) {
                self.arena.update_edge(id, &self.graph);
            }
        }
        for &id in &node_ids {
            if self.arena.is_alive(id) {
                self.enqueue_edge_event(id);
                if self.arena.get(id).reflex {
                    self.enqueue_nearest_split(id);
                }
            }
        }

        skel_ids
    }

    /// §4.5 main loop.
    pub fn run(&mut self) {
        let _span = debug_span!("skeleton::run").entered();
        while let Some(key) = self.queue.pop_first() {
            let record = self.events[key.serial as usize]
                .take()
                .expect("a queued EventKey must have a live EventRecord");
            for p in record.participants() {
                if self.arena.is_alive(p) {
                    self.arena.get_mut(p).events.retain(|k| *k != key);
                }
            }

            let dt = (key.time.0 - self.time).max(0.0);
            debug_assert!(
                key.time.0 + 1e-6 >= self.time,
                "event times must be monotone non-decreasing"
            );
            self.advance(dt);
            self.time = key.time.0;

            match record.data {
                EventData::Edge { n0, n1 } => self.handle_edge_event(n0, n1),
                EventData::Split { reflex, op0, op1 } => self.handle_split_event(reflex, op0, op1),
            }
            self.recheck_aborted_reflex();
        }

        let dt = self.distance - self.time;
        if dt > 0.0 {
            self.advance(dt);
            self.time = self.distance;
        }
    }

    /// Moves every live vertex along its bisector by `dt`.
    pub fn advance(&mut self, dt: f64) {
        if dt == 0.0 {
            return;
        }
        let ids: Vec<NodeId> = self.arena.iter_alive().collect();
        for id in ids {
            let node = self.arena.get(id);
            let skel = node.skel_node;
            let delta = node.bisector * dt;
            if !delta.x.is_finite() || !delta.y.is_finite() {
                trace!(node = id.0, "non-finite displacement during advance, skipping");
                continue;
            }
            self.graph.translate(skel, delta);
        }
    }

    /// §6 `nodeLoops`: the live rings, each as the sequence of `SkelId`s
    /// currently under its moving nodes.
    pub fn live_rings(&self) -> Vec<Vec<SkelId>> {
        let mut visited = HashSet::new();
        let mut rings = Vec::new();
        for id in self.arena.iter_alive() {
            if visited.contains(&id) {
                continue;
            }
            let ring = self.arena.ring_ids_from(id);
            for &r in &ring {
                visited.insert(r);
            }
            rings.push(ring.into_iter().map(|nid| self.arena.get(nid).skel_node).collect());
        }
        rings
    }

    /// Consumes the Context, returning its output graph. Called once a
    /// run has finished and the moving-node arena is no longer needed.
    pub fn into_graph(self) -> SkeletonGraph {
        self.graph
    }

    fn push_event(&mut self, kind: EventKind, data: EventData, time: f64) {
        if kind == EventKind::Split {
            self.split_events_enqueued += 1;
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        let key = EventKey { time: OrderedF64(time), kind, serial };
        let record = EventRecord { key, data };
        for p in record.participants() {
            self.arena.get_mut(p).events.push(key);
        }
        self.events.push(Some(record));
        self.queue.insert(key);
    }

    fn abort_event(&mut self, key: EventKey) {
        if !self.queue.remove(&key) {
            return;
        }
        if let Some(record) = self.events[key.serial as usize].take() {
            for p in record.participants() {
                if self.arena.is_alive(p) {
                    self.arena.get_mut(p).events.retain(|k| *k != key);
                }
            }
            if let EventData::Split { reflex, .. } = record.data {
                if self.arena.is_alive(reflex) {
                    self.aborted_reflex.insert(reflex);
                }
            }
        }
    }

    fn abort_all_events_of(&mut self, node: NodeId) {
        if !self.arena.is_alive(node) {
            return;
        }
        let keys = self.arena.get(node).events.clone();
        for k in keys {
            self.abort_event(k);
        }
    }

    /// Aborts only the events "attached to edge (a, b)" (§4.4
    /// `SplitEvent.handle`): the `(a, b)` `EdgeEvent` itself, plus any
    /// `SplitEvent` that names both `a` and `b` as its candidate edge.
    /// Unlike `abort_all_events_of`, this leaves untouched any event
    /// that merely references `a` or `b` individually — e.g. `b`'s own
    /// still-valid `EdgeEvent` for `(b, b.next)`.
    fn abort_events_of_edge(&mut self, a: NodeId, b: NodeId) {
        if !self.arena.is_alive(a) {
            return;
        }
        let keys: Vec<EventKey> = self.arena.get(a).events.clone();
        for k in keys {
            let names_both = self.events[k.serial as usize]
                .as_ref()
                .is_some_and(|record| record.participants().contains(&b));
            if names_both {
                self.abort_event(k);
            }
        }
    }

    fn enqueue_edge_event(&mut self, id: NodeId) {
        let t = self.arena.get(id).edge_collapse_time;
        let time = self.time + t;
        if reachable(time, self.distance) {
            let n1 = self.arena.get(id).next;
            self.push_event(EventKind::Edge, EventData::Edge { n0: id, n1 }, time);
        }
    }

    /// §4.5 "split-event economy": enqueues only the nearest eligible
    /// split candidate for `reflex`.
    fn enqueue_nearest_split(&mut self, reflex: NodeId) {
        if !self.arena.get(reflex).reflex {
            return;
        }
        let prev = self.arena.get(reflex).prev;
        let next = self.arena.get(reflex).next;
        let ring = self.arena.ring_ids_from(reflex);

        let mut best: Option<(f64, NodeId, NodeId)> = None;
        for &a in &ring {
            let b = self.arena.get(a).next;
            // Eligibility: reflex and the candidate edge must be
            // separated by >= 2 edges along the ring.
            if a == prev || a == reflex || a == next || b == prev || b == reflex || b == next {
                continue;
            }
            if let Some(t) = split_candidate_time(&self.arena, &self.graph, self.distance_sign, reflex, a, b) {
                let time = self.time + t;
                if reachable(time, self.distance) && best.is_none_or(|(bt, _, _)| time < bt) {
                    best = Some((time, a, b));
                }
            }
        }

        if let Some((time, op0, op1)) = best {
            self.push_event(EventKind::Split, EventData::Split { reflex, op0, op1 }, time);
        }
    }

    fn recheck_aborted_reflex(&mut self) {
        let pending: Vec<NodeId> = self.aborted_reflex.iter().copied().collect();
        self.aborted_reflex.clear();
        for r in pending {
            if self.arena.is_alive(r) {
                self.enqueue_nearest_split(r);
            }
        }
    }

    /// §4.4 `EdgeEvent(n0, n1).handle`. Both endpoints have converged to
    /// the same point: `n1` terminates here, joining `n0`'s chain via a
    /// degeneracy edge, and `n0` continues as the surviving vertex.
    fn handle_edge_event(&mut self, n0: NodeId, n1: NodeId) {
        debug_assert_eq!(self.arena.get(n0).next, n1, "EdgeEvent participants must still be adjacent");

        let n0_skel = self.arena.get(n0).skel_node;
        let n1_skel = self.arena.get(n1).skel_node;

        if self.arena.get(n0).reflex || self.arena.get(n1).reflex {
            self.graph.mark_reflex(n0_skel);
        }
        self.graph.add_edge(n1_skel, n0_skel, EdgeKind::Degeneracy);
        self.graph.remap_incoming(n1_skel, n0_skel);

        let n1_next = self.arena.get(n1).next;
        self.arena.link(n0, n1_next);

        self.abort_all_events_of(n1);
        self.arena.remove(n1);

        self.handle_node(n0);
    }

    /// §4.4 `SplitEvent(R, op0, op1).handle`.
    fn handle_split_event(&mut self, reflex: NodeId, op0: NodeId, op1: NodeId) {
        debug_assert_eq!(self.arena.get(op0).next, op1, "SplitEvent opposite edge must still be intact");

        self.abort_events_of_edge(op0, op1);
        self.graph.mark_reflex(self.arena.get(reflex).skel_node);

        let r_next = self.arena.get(reflex).next;
        let r_prev = self.arena.get(reflex).prev;
        let shared_skel = self.arena.get(reflex).skel_node;
        let node1 = self.arena.alloc(shared_skel);

        // node0 (== reflex) sits between op0 and reflex's former next;
        // node1 sits between reflex's former prev and op1.
        self.arena.link(op0, reflex);
        self.arena.link(reflex, r_next);
        self.arena.link(r_prev, node1);
        self.arena.link(node1, op1);

        self.handle_node(reflex);
        self.handle_node(node1);
    }

    /// §4.4 "post-mutation rehandler": the shared finisher invoked after
    /// every structural change.
    fn handle_node(&mut self, mut node: NodeId) {
        loop {
            if self.arena.is_pair(node) {
                let other = self.arena.get(node).next;
                self.finish_pair(node, other);
                return;
            }

            match self.arena.calc_bisector(node, &self.graph, self.distance_sign, self.epsilon) {
                BisectorOutcome::Ok => {
                    self.arena.leave_skeleton_node(node, &mut self.graph);
                    let prev = self.arena.get(node).prev;
                    self.arena.update_edge(node, &self.graph);
                    self.arena.update_edge(prev, &self.graph);

                    self.abort_all_events_of(node);
                    self.enqueue_edge_event(prev);
                    self.enqueue_edge_event(node);
                    if self.arena.get(node).reflex {
                        self.enqueue_nearest_split(node);
                    }
                    return;
                }
                BisectorOutcome::Degenerate => {
                    node = self.handle_degenerate_angle(node);
                }
            }
        }
    }

    /// §4.4 `handleDegenerateAngle`: splices `node` out, connects its
    /// neighbours, and adds a degeneracy edge to whichever lies closer.
    /// Returns the neighbour the rehandler loop should continue at.
    fn handle_degenerate_angle(&mut self, node: NodeId) -> NodeId {
        self.abort_all_events_of(node);

        let prev = self.arena.get(node).prev;
        let next = self.arena.get(node).next;
        self.arena.link(prev, next);

        let p_node = self.graph.node(self.arena.get(node).skel_node).p;
        let p_prev = self.graph.node(self.arena.get(prev).skel_node).p;
        let p_next = self.graph.node(self.arena.get(next).skel_node).p;
        let closer = if (p_node - p_prev).norm_squared() <= (p_node - p_next).norm_squared() {
            prev
        } else {
            next
        };

        self.graph.add_edge(
            self.arena.get(node).skel_node,
            self.arena.get(closer).skel_node,
            EdgeKind::Degeneracy,
        );
        self.arena.remove(node);
        closer
    }

    /// A ring collapsed to two nodes: terminate it with a degeneracy
    /// edge between the two remaining skeleton nodes.
    fn finish_pair(&mut self, node: NodeId, other: NodeId) {
        self.abort_all_events_of(node);
        self.abort_all_events_of(other);
        self.graph.add_edge(
            self.arena.get(node).skel_node,
            self.arena.get(other).skel_node,
            EdgeKind::Degeneracy,
        );
        self.arena.remove(node);
        self.arena.remove(other);
    }
}
