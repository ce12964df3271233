//! Integer-precision polygon tests.
//!
//! Screen-space hit testing only needs single-pixel resolution, so callers
//! truncate float coordinates with [`IntPoint::from_vec2`] and run the exact
//! integer predicates here.

use crate::math::Vec2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IntPoint {
    pub x: i32,
    pub y: i32,
}

impl IntPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Truncates toward zero (saturating at the `i32` range).
    pub fn from_vec2(p: Vec2) -> Self {
        Self::new(p.x as i32, p.y as i32)
    }
}

/// Even-odd containment test. `ring` may be open or closed.
pub fn polygon_contains_point(ring: &[IntPoint], p: IntPoint) -> bool {
    let Some(&last) = ring.last() else {
        return false;
    };

    let mut inside = false;
    let mut prev = last;
    for &cur in ring {
        if (cur.y > p.y) != (prev.y > p.y) {
            let x_cross = (f64::from(prev.x) - f64::from(cur.x))
                * (f64::from(p.y) - f64::from(cur.y))
                / (f64::from(prev.y) - f64::from(cur.y))
                + f64::from(cur.x);
            if (p.x as f64) < x_cross {
                inside = !inside;
            }
        }
        prev = cur;
    }
    inside
}

// Differences span 33 bits and their products 66, hence i128.
fn is_counter_clockwise(a: IntPoint, b: IntPoint, c: IntPoint) -> bool {
    let d = |u: i32, v: i32| i128::from(u) - i128::from(v);
    d(c.y, a.y) * d(b.x, a.x) > d(b.y, a.y) * d(c.x, a.x)
}

pub fn segments_intersect(a0: IntPoint, a1: IntPoint, b0: IntPoint, b1: IntPoint) -> bool {
    is_counter_clockwise(a0, b0, b1) != is_counter_clockwise(a1, b0, b1)
        && is_counter_clockwise(a0, a1, b0) != is_counter_clockwise(a0, a1, b1)
}

/// True if any segment of the open polyline `a` crosses any segment of `b`.
pub fn line_intersects_line(a: &[IntPoint], b: &[IntPoint]) -> bool {
    for sa in a.windows(2) {
        for sb in b.windows(2) {
            if segments_intersect(sa[0], sa[1], sb[0], sb[1]) {
                return true;
            }
        }
    }
    false
}

/// Polygons intersect if either contains a vertex of the other, or their edges cross.
pub fn polygon_intersects_polygon(a: &[IntPoint], b: &[IntPoint]) -> bool {
    if a.iter().any(|&p| polygon_contains_point(b, p)) {
        return true;
    }
    if b.iter().any(|&p| polygon_contains_point(a, p)) {
        return true;
    }
    line_intersects_line(a, b)
}
