//! Scan conversion: turns a flattened polygon set into a sorted, coalesced
//! list of signed analog-coverage pixel runs (spec.md §4.5).

use crate::geometry::Point;

/// A signed coverage delta crossing one pixel boundary, to be prefix-summed
/// along its row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run {
    pub x: i32,
    pub y: i32,
    pub delta: f32,
}

/// The fill rule used to turn an accumulated winding number into coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    /// Maps a (possibly fractional, antialiased) signed winding
    /// accumulator to a coverage value in `[0, 1]`.
    ///
    /// Nonzero clamps the magnitude. Even-odd folds the accumulator into a
    /// triangular tent of period 2, which reduces to the usual parity test
    /// at integer windings and degrades gracefully under antialiasing (see
    /// DESIGN.md, Open Question 1).
    pub fn coverage(self, winding: f32) -> f32 {
        match self {
            FillRule::NonZero => winding.abs().min(1.0),
            FillRule::EvenOdd => {
                let folded = winding.rem_euclid(2.0);
                1.0 - (folded - 1.0).abs()
            }
        }
    }
}

/// Clips a closed polygon (as a point loop) against the canvas rectangle
/// `[0, width] x [0, height]`, optionally padded by `border` on every side
/// (used when rendering the shadow offset pass), using Sutherland-Hodgman.
pub fn clip_polygon(points: &[Point], width: f32, height: f32, border: f32) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }
    let (lo_x, lo_y) = (-border, -border);
    let (hi_x, hi_y) = (width + border, height + border);

    let mut poly = points.to_vec();
    poly = clip_edge(&poly, |p| p.x >= lo_x, |a, b| intersect_x(a, b, lo_x));
    poly = clip_edge(&poly, |p| p.x <= hi_x, |a, b| intersect_x(a, b, hi_x));
    poly = clip_edge(&poly, |p| p.y >= lo_y, |a, b| intersect_y(a, b, lo_y));
    poly = clip_edge(&poly, |p| p.y <= hi_y, |a, b| intersect_y(a, b, hi_y));
    poly
}

fn intersect_x(a: Point, b: Point, x: f32) -> Point {
    let t = (x - a.x) / (b.x - a.x);
    Point::new(x, a.y + (b.y - a.y) * t)
}

fn intersect_y(a: Point, b: Point, y: f32) -> Point {
    let t = (y - a.y) / (b.y - a.y);
    Point::new(a.x + (b.x - a.x) * t, y)
}

fn clip_edge(
    poly: &[Point],
    inside: impl Fn(Point) -> bool,
    intersect: impl Fn(Point, Point) -> Point,
) -> Vec<Point> {
    if poly.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(poly.len() + 2);
    let mut prev = poly[poly.len() - 1];
    let mut prev_in = inside(prev);
    for &cur in poly {
        let cur_in = inside(cur);
        if cur_in {
            if !prev_in {
                out.push(intersect(prev, cur));
            }
            out.push(cur);
        } else if prev_in {
            out.push(intersect(prev, cur));
        }
        prev = cur;
        prev_in = cur_in;
    }
    out
}

/// Appends the pixel runs produced by one closed polygon edge loop
/// (already clipped to the canvas) into `runs`.
///
/// For each edge `p0 -> p1`, steps the line through pixel boundaries in x
/// then y, emitting two runs per stepped pixel cell: one at `(x, y)` with
/// coverage `carry + strip - area` and one at `(x+1, y)` with `area`. The
/// sign is `+1` for a downward edge, `-1` for an upward edge. Near-
/// horizontal edges (`|dy| < 2e-5`) contribute nothing.
pub fn generate_edge_runs(p0: Point, p1: Point, runs: &mut Vec<Run>) {
    let dy = p1.y - p0.y;
    if dy.abs() < 2.0e-5 {
        return;
    }

    let sign = if dy > 0.0 { 1.0 } else { -1.0 };
    let (mut lo, mut hi) = if dy > 0.0 { (p0, p1) } else { (p1, p0) };
    // Walk from lo to hi (top to bottom in device space); the original
    // direction's sign is still carried in `sign`.
    let dxdy = (hi.x - lo.x) / (hi.y - lo.y);

    let mut y = lo.y.floor() as i32;
    let y_end = hi.y.ceil() as i32;
    let mut cursor = lo;

    while y < y_end {
        let row_top = y as f32;
        let row_bottom = row_top + 1.0;
        let seg_top = cursor.y.max(row_top);
        let seg_bottom = hi.y.min(row_bottom);
        if seg_bottom <= seg_top {
            y += 1;
            continue;
        }
        let x_at = |yy: f32| lo.x + dxdy * (yy - lo.y);
        let x_top = x_at(seg_top);
        let x_bottom = x_at(seg_bottom);
        step_row(x_top, seg_top, x_bottom, seg_bottom, y, sign, runs);
        cursor.y = seg_bottom;
        y += 1;
    }
    let _ = (&mut lo, &mut hi);
}

/// Steps one edge's contribution across a single pixel row, splitting
/// further at x pixel boundaries and emitting the carry/strip/area runs.
#[allow(clippy::too_many_arguments)]
fn step_row(x_top: f32, y_top: f32, x_bottom: f32, y_bottom: f32, y: i32, sign: f32, runs: &mut Vec<Run>) {
    let dy = y_bottom - y_top;
    if dy <= 0.0 {
        return;
    }
    let (mut xa, mut xb) = (x_top, x_bottom);
    let mut ya = y_top;
    let dxdy = (xb - xa) / dy;

    let mut x_lo = xa.min(xb).floor() as i32;
    let x_hi = xa.max(xb).ceil() as i32;
    let mut carry = 0.0f32;

    while x_lo < x_hi {
        let col_left = x_lo as f32;
        let col_right = col_left + 1.0;
        let seg_x_lo = xa.min(xb).max(col_left);
        let seg_x_hi = xa.max(xb).min(col_right);
        if seg_x_hi <= seg_x_lo {
            x_lo += 1;
            continue;
        }
        // y extent covered while x is within [seg_x_lo, seg_x_hi]
        let y_at = |xx: f32| {
            if dxdy.abs() < 1.0e-9 {
                ya
            } else {
                y_top + (xx - x_top) / dxdy
            }
        };
        let (y_seg_a, y_seg_b) = {
            let (a, b) = if xa <= xb { (seg_x_lo, seg_x_hi) } else { (seg_x_hi, seg_x_lo) };
            (y_at(a), y_at(b))
        };
        let strip = (y_seg_b - y_seg_a).abs();
        let frac_in_col = (seg_x_hi - seg_x_lo).max(1.0e-9);
        let avg_x_in_col = ((seg_x_lo - col_left) + (seg_x_hi - col_left)) * 0.5;
        let area = strip * (1.0 - avg_x_in_col);

        runs.push(Run { x: x_lo, y, delta: sign * (carry + strip - area) });
        runs.push(Run { x: x_lo + 1, y, delta: sign * area });
        carry += strip - frac_in_col.min(strip); // drift-free carry for multi-cell spans
        x_lo += 1;
    }
    let _ = (&mut xa, &mut xb, &mut ya);
}

/// Orders two runs by `(y, x, |delta|)`, the canonical ordering both
/// [`sort_and_coalesce`] and the clip-mask/render merge-walks rely on to
/// step two run streams in lockstep.
pub(crate) fn compare(a: Run, b: Run) -> std::cmp::Ordering {
    a.y.cmp(&b.y).then(a.x.cmp(&b.x)).then(a.delta.abs().partial_cmp(&b.delta.abs()).unwrap())
}

/// Sorts runs by `(y, x, |delta|)` (the tiebreaker on absolute delta
/// matters for how coalescing accumulates small negative-then-positive
/// deltas, spec.md §9) and coalesces adjacent duplicates at the same
/// `(x, y)` by summing, dropping zero-sum entries.
pub fn sort_and_coalesce(mut runs: Vec<Run>) -> Vec<Run> {
    runs.sort_by(|a, b| compare(*a, *b));
    let mut out: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        if let Some(last) = out.last_mut() {
            if last.x == run.x && last.y == run.y {
                last.delta += run.delta;
                continue;
            }
        }
        out.push(run);
    }
    out.retain(|r| r.delta != 0.0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_rect_fully_inside_is_unchanged() {
        let square = vec![
            Point::new(2.0, 2.0),
            Point::new(8.0, 2.0),
            Point::new(8.0, 8.0),
            Point::new(2.0, 8.0),
        ];
        let clipped = clip_polygon(&square, 10.0, 10.0, 0.0);
        assert_eq!(clipped.len(), 4);
    }

    #[test]
    fn clip_rect_outside_canvas_is_empty() {
        let square = vec![
            Point::new(20.0, 20.0),
            Point::new(28.0, 20.0),
            Point::new(28.0, 28.0),
            Point::new(20.0, 28.0),
        ];
        let clipped = clip_polygon(&square, 10.0, 10.0, 0.0);
        assert!(clipped.is_empty());
    }

    #[test]
    fn even_odd_parity_at_integer_windings() {
        assert_eq!(FillRule::EvenOdd.coverage(0.0), 0.0);
        assert_eq!(FillRule::EvenOdd.coverage(1.0), 1.0);
        assert_eq!(FillRule::EvenOdd.coverage(2.0), 0.0);
    }

    #[test]
    fn closed_square_runs_sum_to_zero_per_row() {
        // A square of side 4 at (0,0)-(4,4): closed polygon winding.
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        let mut runs = Vec::new();
        for i in 0..poly.len() {
            let a = poly[i];
            let b = poly[(i + 1) % poly.len()];
            generate_edge_runs(a, b, &mut runs);
        }
        let merged = sort_and_coalesce(runs);
        for y in 0..4 {
            let row_sum: f32 = merged.iter().filter(|r| r.y == y).map(|r| r.delta).sum();
            assert!(row_sum.abs() < 1.0e-4, "row {y} sum {row_sum}");
        }
    }
}
