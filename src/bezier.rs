//! Cubic Bézier flattening: splits each curve at its axis extrema and
//! inflection point, then recursively subdivides each monotone piece until
//! it is flat enough (and, for strokes, shallow enough in angle) to emit as
//! line segments (spec.md §4.2).

use crate::geometry::Point;

/// Squared flatness tolerance: `(1/8)^2`.
const FLATNESS_SQUARED: f32 = 1.0 / 64.0;
/// Recursion depth cap (halvings) before forcing termination.
const MAX_DEPTH: u32 = 20;
/// Angular limit that disables the angle gate entirely (fills).
pub const ANGLE_DISABLED: f32 = -1.0;

/// Angular limit (a cosine bound) derived from a stroke's line width, per
/// spec.md §4.2: narrow strokes tolerate larger angles per flattening step.
pub fn stroke_angular_limit(line_width: f32) -> f32 {
    let r = 0.125 / (line_width / 2.0).max(0.125);
    (r - 2.0) * r * 2.0 + 1.0
}

/// Flattens one cubic Bézier segment into `out`, which receives the curve's
/// interior and endpoint (the start point is assumed already present).
pub fn flatten_cubic(p0: Point, c1: Point, c2: Point, p1: Point, angular: f32, out: &mut Vec<Point>) {
    let edge1 = c1 - p0;
    let edge3 = p1 - c2;
    if edge1.length_squared() == 0.0 && edge3.length_squared() == 0.0 {
        out.push(p1);
        return;
    }

    let mut cuts = find_cuts(p0, c1, c2, p1);
    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut prev_t = 0.0f32;
    let mut prev_curve = (p0, c1, c2, p1);
    for &t in cuts.iter().chain(std::iter::once(&1.0f32)) {
        if !(0.0..=1.0).contains(&t) || t <= prev_t {
            continue;
        }
        // Re-split the *original* curve at prev_t and t to get this
        // monotone sub-segment without compounding rounding error.
        let local_t = (t - prev_t) / (1.0 - prev_t);
        let (left, right) = split_cubic(prev_curve, local_t);
        subdivide(left.0, left.1, left.2, left.3, angular, MAX_DEPTH, out);
        prev_curve = right;
        prev_t = t;
    }
}

/// Parameter cuts at axis extrema (roots of each derivative component) and
/// at the curve's inflection (root of the curvature numerator), discarding
/// any outside `(0, 1)`.
fn find_cuts(p0: Point, c1: Point, c2: Point, p1: Point) -> Vec<f32> {
    let mut cuts = Vec::with_capacity(4);

    // Derivative of a cubic Bezier is a quadratic in t; find its roots per
    // axis: B'(t)/3 = (1-t)^2*(c1-p0) + 2(1-t)t*(c2-c1) + t^2*(p1-c2).
    let e1 = c1 - p0;
    let e2 = c2 - c1;
    let e3 = p1 - c2;
    let axis_roots = |a0: f32, a1: f32, a2: f32, cuts: &mut Vec<f32>| {
        // quadratic: (a0 - 2a1 + a2) t^2 + 2(a1 - a0) t + a0 == 0
        let a = a0 - 2.0 * a1 + a2;
        let b = 2.0 * (a1 - a0);
        let c = a0;
        if a.abs() > 1.0e-6 {
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let sq = disc.sqrt();
                cuts.push((-b + sq) / (2.0 * a));
                cuts.push((-b - sq) / (2.0 * a));
            }
        } else if b.abs() > 1.0e-6 {
            cuts.push(-c / b);
        }
    };
    axis_roots(e1.x, e2.x, e3.x, &mut cuts);
    axis_roots(e1.y, e2.y, e3.y, &mut cuts);

    // Inflection: root of the curvature numerator, a quadratic in t formed
    // from the cross products of successive edges.
    let d1 = e1.cross(e2);
    let d2 = e1.cross(e3);
    let d3 = e2.cross(e3);
    let curve_a = d1 - d2 + d3;
    let curve_b = -2.0 * d1 + d2;
    if curve_a.abs() > 1.0e-4 && curve_b.abs() > 1.0e-4 {
        cuts.push(-0.5 * curve_b / curve_a);
    }

    cuts.retain(|t| *t > 0.0 && *t < 1.0 && t.is_finite());
    cuts
}

type Cubic = (Point, Point, Point, Point);

/// Splits a cubic at parameter `t` via De Casteljau, returning the two
/// resulting cubics.
fn split_cubic((p0, c1, c2, p1): Cubic, t: f32) -> (Cubic, Cubic) {
    let p01 = p0.lerp(c1, t);
    let p12 = c1.lerp(c2, t);
    let p23 = c2.lerp(p1, t);
    let p012 = p01.lerp(p12, t);
    let p123 = p12.lerp(p23, t);
    let split = p012.lerp(p123, t);
    ((p0, p01, p012, split), (split, p123, p23, p1))
}

/// Recursively subdivides a monotone cubic at `t = 0.5` until both control
/// points are within the flatness tolerance of the chord and the angle
/// between successive edges satisfies the angular bound, or the depth cap
/// is hit.
fn subdivide(p0: Point, c1: Point, c2: Point, p1: Point, angular: f32, depth: u32, out: &mut Vec<Point>) {
    let edge1 = c1 - p0;
    let edge2 = c2 - c1;
    let edge3 = p1 - c2;
    let chord = p1 - p0;
    let chord_len_sq = chord.length_squared().max(1.0e-8);

    let flat_enough = |control: Point| -> bool {
        let t = ((control - p0).dot(chord) / chord_len_sq).clamp(0.0, 1.0);
        let proj = p0 + chord * t;
        (control - proj).length_squared() <= FLATNESS_SQUARED
    };

    // Net turn across the whole segment, preferring the widest-spanning
    // pair of edges with nonzero length and falling back to an adjacent
    // pair only when that pair is degenerate.
    let angle_ok = if angular <= ANGLE_DISABLED {
        true
    } else {
        let squared_1 = edge1.length_squared();
        let squared_2 = edge2.length_squared();
        let squared_3 = edge3.length_squared();
        let cosine = if squared_1 * squared_3 != 0.0 {
            edge1.dot(edge3) / (squared_1 * squared_3).sqrt()
        } else if squared_1 * squared_2 != 0.0 {
            edge1.dot(edge2) / (squared_1 * squared_2).sqrt()
        } else if squared_2 * squared_3 != 0.0 {
            edge2.dot(edge3) / (squared_2 * squared_3).sqrt()
        } else {
            1.0
        };
        cosine >= angular
    };

    if depth == 0 || (flat_enough(c1) && flat_enough(c2) && angle_ok) {
        if angular > ANGLE_DISABLED && edge1.length_squared() != 0.0 {
            out.push(c1);
        }
        if angular > ANGLE_DISABLED && edge2.length_squared() != 0.0 {
            out.push(c2);
        }
        if angular == ANGLE_DISABLED || edge3.length_squared() != 0.0 {
            out.push(p1);
        }
        return;
    }

    let (left, right) = split_cubic((p0, c1, c2, p1), 0.5);
    subdivide(left.0, left.1, left.2, left.3, angular, depth - 1, out);
    subdivide(right.0, right.1, right.2, right.3, angular, depth - 1, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_cubic_flattens_to_endpoint_only() {
        let mut out = Vec::new();
        let p0 = Point::new(0.0, 0.0);
        let p1 = Point::new(30.0, 0.0);
        let c1 = p0.lerp(p1, 1.0 / 3.0);
        let c2 = p0.lerp(p1, 2.0 / 3.0);
        flatten_cubic(p0, c1, c2, p1, ANGLE_DISABLED, &mut out);
        assert_eq!(out.last().copied(), Some(p1));
        // A collinear cubic should flatten to very few points.
        assert!(out.len() <= 2, "expected near-trivial flattening, got {out:?}");
    }

    #[test]
    fn curved_bezier_produces_multiple_points() {
        let mut out = Vec::new();
        flatten_cubic(
            Point::new(0.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
            ANGLE_DISABLED,
            &mut out,
        );
        assert!(out.len() > 4);
        assert_eq!(out.last().copied(), Some(Point::new(100.0, 0.0)));
    }

    #[test]
    fn stroke_angular_limit_narrows_for_wide_strokes() {
        let narrow = stroke_angular_limit(0.5);
        let wide = stroke_angular_limit(20.0);
        // Wider strokes use a tighter (larger cosine) angular bound.
        assert!(wide > narrow);
    }
}
