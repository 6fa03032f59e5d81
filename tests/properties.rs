//! Spec §8 testable properties, expressed as plain deterministic
//! `#[test]`s over hand-built polygons (no property-testing crate is
//! used anywhere in the retrieval pack this crate was grown from).

use nalgebra::Point2;
use straight_skeleton::{Context, SkeletonConfig, apply};

fn pts(coords: &[(f64, f64)]) -> Vec<Point2<f64>> {
    coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
}

/// Runs `polygon` directly through a `Context` (bypassing `apply`'s
/// bbox-distance resolution, since these checks only care about the
/// split-event count) and returns how many `SplitEvent`s were ever
/// enqueued over the run.
fn splits_enqueued_for(polygon: &[Point2<f64>]) -> u64 {
    let mut ctx = Context::new(1e-4);
    ctx.reset(1e6, -1.0);
    ctx.seed_polygon(polygon);
    ctx.run();
    ctx.split_events_enqueued()
}

fn shrink_config() -> SkeletonConfig {
    SkeletonConfig { distance: f64::NEG_INFINITY, epsilon: 1e-4 }
}

/// Property 4: skeleton mapping symmetry, `A.outgoing[B] = K <=> B.incoming[A] = K`,
/// checked over the whole graph of a non-trivial run.
#[test]
fn mapping_symmetry_holds_across_full_run() {
    let polygon = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 8.0), (7.0, 8.0), (7.0, 10.0), (0.0, 10.0)]);
    let result = apply(&polygon, shrink_config()).unwrap();
    let graph = result.graph();

    for id in graph.ids() {
        for (to, kind) in graph.node(id).outgoing() {
            let found = graph.node(to).incoming().any(|(from, k)| from == id && k == kind);
            assert!(found, "outgoing edge {id:?}->{to:?} has no matching incoming entry");
        }
        for (from, kind) in graph.node(id).incoming() {
            let found = graph.node(from).outgoing().any(|(to, k)| to == id && k == kind);
            assert!(found, "incoming edge {from:?}->{id:?} has no matching outgoing entry");
        }
    }
}

/// Property 7: strictly convex input never enqueues a SplitEvent — a
/// regular hexagon collapses to its center using only EdgeEvents.
#[test]
fn convex_hexagon_collapses_to_center_without_splits() {
    let r = 4.0_f64;
    let polygon: Vec<Point2<f64>> = (0..6)
        .map(|i| {
            let theta = std::f64::consts::TAU * (i as f64) / 6.0;
            Point2::new(r * theta.cos(), r * theta.sin())
        })
        .collect();
    let result = apply(&polygon, shrink_config()).unwrap();
    for &start in result.start_nodes() {
        let mut cur = start;
        loop {
            match result.graph().node(cur).outgoing().next() {
                Some((next, _)) => cur = next,
                None => break,
            }
        }
        let p = result.position_of(cur);
        assert!(p.x.abs() < 1e-2, "x={}", p.x);
        assert!(p.y.abs() < 1e-2, "y={}", p.y);
    }
}

/// Property 7: a strictly convex input enqueues zero SplitEvents.
#[test]
fn convex_hexagon_enqueues_no_split_events() {
    let r = 4.0_f64;
    let polygon: Vec<Point2<f64>> = (0..6)
        .map(|i| {
            let theta = std::f64::consts::TAU * (i as f64) / 6.0;
            Point2::new(r * theta.cos(), r * theta.sin())
        })
        .collect();
    assert_eq!(splits_enqueued_for(&polygon), 0);
}

/// Property 8: triangles and concave quadrilaterals (the "arrowhead"
/// case, S5) never enqueue a SplitEvent, even though the arrowhead has
/// a reflex vertex.
#[test]
fn small_rings_never_enqueue_split_events() {
    let triangle = pts(&[(0.0, 0.0), (6.0, 0.0), (0.0, 4.0)]);
    assert_eq!(splits_enqueued_for(&triangle), 0);

    let arrowhead = pts(&[(0.0, 0.0), (4.0, 0.0), (2.0, 1.0), (2.0, 4.0)]);
    assert_eq!(splits_enqueued_for(&arrowhead), 0);
}

/// Property 8: triangles and quadrilaterals never generate SplitEvents
/// regardless of concavity. A triangle always collapses to its incenter.
#[test]
fn triangle_collapses_to_incenter() {
    let polygon = pts(&[(0.0, 0.0), (6.0, 0.0), (0.0, 4.0)]);
    let result = apply(&polygon, shrink_config()).unwrap();
    assert_eq!(result.start_nodes().len(), 3);

    // Right angle at the origin with legs 6 and 4: the incenter sits at
    // (r, r) where r is the inradius (leg1 + leg2 - hypotenuse) / 2.
    let hypot = (6.0_f64 * 6.0 + 4.0 * 4.0).sqrt();
    let r = (6.0 + 4.0 - hypot) / 2.0;
    let incenter_x = r;
    let incenter_y = r;

    for &start in result.start_nodes() {
        let mut cur = start;
        loop {
            match result.graph().node(cur).outgoing().next() {
                Some((next, _)) => cur = next,
                None => break,
            }
        }
        let p = result.position_of(cur);
        assert!((p.x - incenter_x).abs() < 1e-2, "x={} expected={}", p.x, incenter_x);
        assert!((p.y - incenter_y).abs() < 1e-2, "y={} expected={}", p.y, incenter_y);
    }
}

/// Property 6: area monotonicity under shrink — querying an inset at an
/// earlier distance must never have *larger* area than a later one.
#[test]
fn inset_area_shrinks_monotonically_with_distance() {
    let polygon = pts(&[(0.0, 0.0), (8.0, 0.0), (8.0, 6.0), (0.0, 6.0)]);

    fn area(pts: &[Point2<f64>]) -> f64 {
        let mut sum = 0.0;
        for i in 0..pts.len() {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            sum += a.x * b.y - b.x * a.y;
        }
        (sum * 0.5).abs()
    }

    let near = apply(&polygon, SkeletonConfig { distance: -0.5, epsilon: 1e-4 }).unwrap();
    let far = apply(&polygon, SkeletonConfig { distance: -1.5, epsilon: 1e-4 }).unwrap();

    let near_ring: Vec<Point2<f64>> = near.node_loops()[0].iter().map(|&id| near.position_of(id)).collect();
    let far_ring: Vec<Point2<f64>> = far.node_loops()[0].iter().map(|&id| far.position_of(id)).collect();

    assert!(area(&far_ring) < area(&near_ring));
}

/// Property 1 (ring integrity) and 2 (monotone time) are exercised
/// indirectly: any violation trips a `debug_assert!` inside
/// `Context::run`/`handle_*`, which would abort this test binary in a
/// debug build. A full run over every concrete scenario polygon is the
/// practical surface for this.
#[test]
fn ring_integrity_and_monotone_time_hold_across_all_scenarios() {
    let scenarios: Vec<(Vec<Point2<f64>>, f64)> = vec![
        (pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]), f64::NEG_INFINITY),
        (pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)]), -1.0),
        (
            pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 8.0), (7.0, 8.0), (7.0, 10.0), (0.0, 10.0)]),
            f64::NEG_INFINITY,
        ),
        (pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]), 1.0),
        (pts(&[(0.0, 0.0), (4.0, 0.0), (2.0, 1.0), (2.0, 4.0)]), f64::NEG_INFINITY),
        (pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 0.0001), (0.0, 0.0001)]), f64::NEG_INFINITY),
    ];
    for (polygon, distance) in scenarios {
        let result = apply(&polygon, SkeletonConfig { distance, epsilon: 1e-4 });
        assert!(result.is_ok());
    }
}
