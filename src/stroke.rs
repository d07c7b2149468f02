//! Dashing and stroke expansion: turns a flattened polyline subpath into the
//! closed polygon(s) that make up its stroked outline (spec.md §4.4).

use crate::bezier::{flatten_cubic, ANGLE_DISABLED};
use crate::geometry::{Affine, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Square,
    Circle,
}

#[derive(Debug, Clone, Default)]
pub struct StrokeStyle {
    pub width: f32,
    pub miter_limit: f32,
    pub join: LineJoin,
    pub cap: LineCap,
    pub dash: Vec<f32>,
    pub dash_offset: f32,
}

/// Breaks a flattened polyline into its dashed-on stretches, per the dash
/// array and offset. Returns `(points, closed)` pairs ready to feed to
/// [`stroke_subpath`]; an empty or all-zero dash array is a no-op that
/// returns the input unchanged.
///
/// `points` are in device space, but dash lengths are measured in user
/// space (spec.md §4.4) so the pattern scales with the active transform;
/// `inverse` converts each edge's endpoints back to user space purely to
/// measure its length, while the emitted cut points stay in device space
/// (an affine map preserves the interpolation fraction along a line, so
/// cutting the device-space edge at the user-space-derived `t` is exact).
///
/// A closed path whose first and last dashed-on stretch both touch the
/// closing point is merged into one stretch so the pattern doesn't show a
/// seam at an arbitrary start point (spec.md §9 note on dash merging).
pub fn dash_polyline(points: &[Point], closed: bool, dash: &[f32], offset: f32, inverse: &Affine) -> Vec<(Vec<Point>, bool)> {
    if dash.is_empty() || points.len() < 2 {
        return vec![(points.to_vec(), closed)];
    }
    let total: f32 = dash.iter().sum();
    if total <= 0.0 {
        return vec![(points.to_vec(), closed)];
    }

    let mut start = 0usize;
    let mut cursor = offset.rem_euclid(total);
    while cursor >= dash[start] {
        cursor -= dash[start];
        start = (start + 1) % dash.len();
    }

    let mut segment = start;
    let mut emit = start % 2 == 0;
    let mut next_dash = dash[start] - cursor;

    let mut stretches: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = if emit { vec![points[0]] } else { Vec::new() };

    let edge_count = if closed { points.len() } else { points.len() - 1 };
    for i in 0..edge_count {
        let from = points[i];
        let to = points[(i + 1) % points.len()];
        let line_len = (inverse.apply(to) - inverse.apply(from)).length();
        if line_len <= 0.0 {
            continue;
        }
        let mut walked = 0.0f32;
        while next_dash < line_len - walked {
            let t = (walked + next_dash) / line_len;
            let cut = from.lerp(to, t);
            if emit {
                current.push(cut);
                stretches.push(std::mem::take(&mut current));
            } else {
                current = vec![cut];
            }
            walked += next_dash;
            segment = (segment + 1) % dash.len();
            emit = !emit;
            next_dash = dash[segment];
        }
        next_dash -= line_len - walked;
        if emit {
            current.push(to);
        }
    }
    if emit && current.len() > 1 {
        stretches.push(current);
    }

    if closed && stretches.len() > 1 {
        let first_touches_start = stretches[0].first() == Some(&points[0]);
        let last_touches_start = stretches.last().unwrap().last() == Some(&points[0]);
        if first_touches_start && last_touches_start && start % 2 == 0 {
            let mut merged = stretches.pop().unwrap();
            merged.extend(stretches.remove(0));
            stretches.push(merged);
        }
    }

    stretches.into_iter().map(|s| (s, false)).collect()
}

/// Expands one polyline subpath into its stroked outline, appending the
/// resulting closed polygon loop(s) to `out` (device-space points, one
/// `Vec<Point>` per loop). A closed input produces two loops (the outer and
/// inner offset rings); an open input produces one loop formed by walking
/// forward then back with caps at both ends.
pub fn stroke_subpath(
    points: &[Point],
    closed: bool,
    style: &StrokeStyle,
    forward: &Affine,
    inverse: &Affine,
    out: &mut Vec<Vec<Point>>,
) {
    if points.len() < 2 || style.width <= 0.0 {
        return;
    }
    let half = style.width * 0.5;
    let user: Vec<Point> = points.iter().map(|p| inverse.apply(*p)).collect();

    let mut first_loop = Vec::new();
    half_stroke(&user, closed, half, style, forward, &mut first_loop);
    if closed {
        if first_loop.len() >= 3 {
            out.push(first_loop);
        }
        let mut reversed = user.clone();
        reversed.reverse();
        let mut second_loop = Vec::new();
        half_stroke(&reversed, closed, half, style, forward, &mut second_loop);
        if second_loop.len() >= 3 {
            out.push(second_loop);
        }
    } else {
        let mut reversed = user;
        reversed.reverse();
        half_stroke(&reversed, closed, half, style, forward, &mut first_loop);
        if first_loop.len() >= 3 {
            out.push(first_loop);
        }
    }
}

struct Edge {
    end: Point,
    dir: Point,
    len: f32,
}

fn build_edges(points: &[Point], closed: bool) -> Vec<Edge> {
    let n = points.len();
    let edge_count = if closed { n } else { n - 1 };
    let mut edges = Vec::with_capacity(edge_count);
    for i in 0..edge_count {
        let a = points[i];
        let b = points[(i + 1) % n];
        let v = b - a;
        let len = v.length();
        if len >= 1.0e-4 {
            edges.push(Edge { end: b, dir: v * (1.0 / len), len });
        }
    }
    edges
}

/// One directed half of a stroke ribbon (spec.md §4.4): walks the polyline's
/// edges emitting an offset-corner join at every interior vertex (and, for
/// a closed path, at the wraparound vertex too), then an end cap for an
/// open path. Grounded directly on the reference rasterizer's half-stroke
/// pass, with its index-juggling loop control flattened into an edge list.
fn half_stroke(points: &[Point], closed: bool, half: f32, style: &StrokeStyle, forward: &Affine, out: &mut Vec<Point>) {
    let edges = build_edges(points, closed);
    if edges.is_empty() {
        return;
    }

    let joins = if closed { edges.len() } else { edges.len().saturating_sub(1) };
    for i in 0..joins {
        let in_edge = &edges[i];
        let out_edge = &edges[(i + 1) % edges.len()];
        emit_join(in_edge.end, in_edge.dir, in_edge.len, out_edge.dir, out_edge.len, half, style, forward, out);
    }

    if !closed {
        let last = edges.last().unwrap();
        emit_cap(last.end, last.dir, half, style, forward, out);
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_join(
    point: Point,
    in_dir_in: Point,
    in_len: f32,
    out_dir_in: Point,
    out_len: f32,
    half: f32,
    style: &StrokeStyle,
    forward: &Affine,
    out: &mut Vec<Point>,
) {
    let ratio = style.miter_limit * style.miter_limit * half * half;
    let mut in_dir = in_dir_in;
    let mut out_dir = out_dir_in;
    let mut side_in = point + in_dir.perpendicular() * half;
    let mut side_out = point + out_dir.perpendicular() * half;

    let mut turn = in_dir.perpendicular().dot(out_dir);
    if turn.abs() < 1.0e-4 {
        turn = 0.0;
    }
    let offset_vec = if turn == 0.0 {
        Point::ZERO
    } else {
        (out_dir - in_dir) * (half / turn)
    };
    let tight = offset_vec.dot(in_dir) < -in_len && offset_vec.dot(out_dir) > out_len;

    let push = |p: Point, out: &mut Vec<Point>| out.push(forward.apply(p));

    if turn > 0.0 && tight {
        std::mem::swap(&mut side_in, &mut side_out);
        std::mem::swap(&mut in_dir, &mut out_dir);
        push(side_out, out);
        push(point, out);
        push(side_in, out);
    }

    if (turn > 0.0 && !tight) || (turn != 0.0 && style.join == LineJoin::Miter && offset_vec.dot(offset_vec) <= ratio) {
        push(point + offset_vec, out);
    } else if turn != 0.0 && style.join == LineJoin::Round {
        let cos_val = in_dir.dot(out_dir).clamp(-1.0, 1.0);
        let angle = cos_val.acos();
        let alpha = (4.0 / 3.0) * (0.25 * angle).tan();
        push(side_in, out);
        let c1 = forward.apply(side_in + in_dir * (alpha * half));
        let c2 = forward.apply(side_out - out_dir * (alpha * half));
        flatten_cubic(forward.apply(side_in), c1, c2, forward.apply(side_out), ANGLE_DISABLED, out);
    } else if turn != 0.0 {
        push(side_in, out);
        push(side_out, out);
    }

    if turn > 0.0 && tight {
        push(side_out, out);
        push(point, out);
        push(side_in, out);
    }
}

fn emit_cap(point: Point, ahead_dir: Point, half: f32, style: &StrokeStyle, forward: &Affine, out: &mut Vec<Point>) {
    let ahead = ahead_dir * half;
    let side = ahead.perpendicular();
    match style.cap {
        LineCap::Butt => {
            out.push(forward.apply(point + side));
            out.push(forward.apply(point - side));
        }
        LineCap::Square => {
            out.push(forward.apply(point + ahead + side));
            out.push(forward.apply(point + ahead - side));
        }
        LineCap::Circle => {
            // Two quarter-circle Beziers around the cap semicircle, using
            // the standard unit-circle quadrant control-point ratio.
            const ALPHA: f32 = 0.552_284_75;
            let p_side = point + side;
            let p_ahead = point + ahead;
            let p_neg_side = point - side;
            out.push(forward.apply(p_side));
            flatten_cubic(
                forward.apply(p_side),
                forward.apply(p_side + ahead * ALPHA),
                forward.apply(p_ahead + side * ALPHA),
                forward.apply(p_ahead),
                ANGLE_DISABLED,
                out,
            );
            flatten_cubic(
                forward.apply(p_ahead),
                forward.apply(p_ahead - side * ALPHA),
                forward.apply(p_neg_side + ahead * ALPHA),
                forward.apply(p_neg_side),
                ANGLE_DISABLED,
                out,
            );
        }
    }
}
