//! 2D geometric primitives used pervasively by the skeleton kernel.
//!
//! All geometry here operates on `f64` coordinates. The sign of
//! [`determinant`] defines "left of": a positive value means `b` is
//! counter-clockwise from `a`.

use nalgebra::{Point2, Vector2};

/// Signed parallelogram area (2x the signed triangle area) of `a` and `b`,
/// i.e. the 2D cross product `a.x*b.y - a.y*b.x`.
#[inline]
pub fn determinant(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// `true` if `v` has any non-finite component (NaN or +/-inf).
#[inline]
pub fn is_invalid(v: Vector2<f64>) -> bool {
    !v.x.is_finite() || !v.y.is_finite()
}

/// Normalizes `v`, returning the zero vector instead of NaN when `v` is
/// (near-)zero length, mirroring the teacher crate's `EarClip::safe_normalize`.
#[inline]
pub fn safe_normalize(v: Vector2<f64>) -> Vector2<f64> {
    let n = v.normalize();
    if n.x.is_finite() && n.y.is_finite() {
        n
    } else {
        Vector2::new(0.0, 0.0)
    }
}

/// A comparison-time sentinel: any comparison `t <= distance` where `t`
/// is NaN must read as `false`. This helper makes that intent explicit
/// at call sites instead of relying on float-NaN semantics silently.
#[inline]
pub fn reachable(t: f64, distance: f64) -> bool {
    // NaN comparisons are false by IEEE-754 semantics already, but this
    // makes the "NaN is a dropped-event sentinel" contract explicit.
    t.is_finite() && t <= distance
}

/// Total-order wrapper over `f64` for use as a `BTreeSet`/`BTreeMap` key.
/// NaNs are treated as greater than any other value, which is never
/// observed in practice because NaN times are filtered out before they
/// reach an ordered container (see [`reachable`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedF64(pub f64);

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Axis-aligned bounding box, used only to bound a `distance = +/-inf`
/// request (§4.5 "Time bound").
#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Default for Rect {
    fn default() -> Self {
        Rect {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }
}

impl Rect {
    pub fn union(&mut self, p: Point2<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }
}
