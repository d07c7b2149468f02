//! Path construction: subpaths of cubic Bézier segments stored in device
//! space (spec.md §3, §4.3).

use crate::geometry::{Affine, Point};

/// A contiguous run of cubic Bézier segments sharing one start point.
///
/// `points.len()` is always `1 (mod 3)`: the first point is the start
/// anchor, and every following triple is `(control1, control2, end)` for one
/// segment.
#[derive(Debug, Clone, Default)]
pub struct Subpath {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Subpath {
    fn new(start: Point) -> Self {
        Subpath { points: vec![start], closed: false }
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.points.len() / 3
    }

    #[inline]
    pub fn start(&self) -> Point {
        self.points[0]
    }

    #[inline]
    pub fn end(&self) -> Point {
        *self.points.last().unwrap()
    }

    fn push_cubic(&mut self, c1: Point, c2: Point, end: Point) {
        let last = self.end();
        if last == c1 && c1 == c2 && c2 == end {
            // Degenerate (zero-length) segment: dropped at append time.
            return;
        }
        self.points.push(c1);
        self.points.push(c2);
        self.points.push(end);
    }
}

/// An ordered list of subpaths, all points already transformed into device
/// space at the time of the call that created them (spec.md §3 invariant:
/// once in the path, points are not re-transformed).
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub subpaths: Vec<Subpath>,
    has_current_point: bool,
}

impl Path {
    pub fn new() -> Self {
        Path::default()
    }

    pub fn clear(&mut self) {
        self.subpaths.clear();
        self.has_current_point = false;
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|s| s.segment_count() == 0)
    }

    pub fn has_current_point(&self) -> bool {
        self.has_current_point
    }

    pub fn current_point(&self) -> Option<Point> {
        self.has_current_point.then(|| self.subpaths.last().unwrap().end())
    }

    /// `move_to`: starts a new subpath. A move-to that immediately follows
    /// another move-to with no intervening segment replaces the single
    /// anchor rather than leaving an empty subpath behind.
    pub fn move_to(&mut self, p: Point) {
        if let Some(last) = self.subpaths.last_mut() {
            if last.segment_count() == 0 {
                last.points[0] = p;
                self.has_current_point = true;
                return;
            }
        }
        self.subpaths.push(Subpath::new(p));
        self.has_current_point = true;
    }

    /// `line_to`, lowered to a degenerate cubic. Falls back to `move_to` if
    /// no current point exists yet. Zero-length lines are dropped.
    pub fn line_to(&mut self, p: Point) {
        if !self.has_current_point {
            self.move_to(p);
            return;
        }
        let last = self.subpaths.last_mut().unwrap();
        last.push_cubic(p, p, p);
    }

    /// `bezier_curve_to`, the only non-degenerate primitive; everything
    /// else (quadratics, lines, arcs, rects) lowers onto this.
    pub fn bezier_curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        if !self.has_current_point {
            self.move_to(end);
            return;
        }
        let last = self.subpaths.last_mut().unwrap();
        last.push_cubic(c1, c2, end);
    }

    /// `quadratic_curve_to`, lowered to an equivalent cubic.
    pub fn quadratic_curve_to(&mut self, control: Point, end: Point) {
        let start = match self.current_point() {
            Some(p) => p,
            None => {
                self.move_to(end);
                return;
            }
        };
        let c1 = start + (control - start) * (2.0 / 3.0);
        let c2 = end + (control - end) * (2.0 / 3.0);
        self.bezier_curve_to(c1, c2, end);
    }

    /// `close_path`: marks the current subpath closed and appends a
    /// closing segment back to its start if not already there.
    pub fn close_path(&mut self) {
        let Some(last) = self.subpaths.last_mut() else { return };
        if last.segment_count() == 0 {
            return;
        }
        let start = last.start();
        if last.end() != start {
            last.push_cubic(start, start, start);
        }
        last.closed = true;
        // Canvas semantics: after closing, the current point is the
        // subpath's start, and a further `line_to` begins a new subpath
        // there rather than continuing this one.
        let start = last.start();
        self.subpaths.push(Subpath::new(start));
        self.has_current_point = true;
    }

    /// `rectangle`: appends a new closed 4-point subpath without disturbing
    /// the current subpath in progress (matches the DOM canvas semantics
    /// where `rect` starts its own subpath and leaves `current point`
    /// untouched in spirit, though here we do advance it like the original
    /// since our data model has a single current-point notion).
    pub fn rectangle(&mut self, origin: Point, size: Point) {
        self.move_to(origin);
        self.line_to(Point::new(origin.x + size.x, origin.y));
        self.line_to(Point::new(origin.x + size.x, origin.y + size.y));
        self.line_to(Point::new(origin.x, origin.y + size.y));
        self.close_path();
    }

    /// Appends a circular-arc-derived cubic fan. `start_angle`/`end_angle`
    /// are in radians; `span` is the signed angular distance already
    /// normalized by the caller. Uses at most 16 cubic segments per full
    /// turn, each approximated with `alpha = (4/3) * tan(segment / 4)`
    /// (spec.md §4.3).
    pub fn arc(&mut self, center: Point, radius: f32, start_angle: f32, span: f32) {
        if radius < 0.0 || !radius.is_finite() || !span.is_finite() {
            return;
        }
        let steps = (16.0 * span.abs() / std::f32::consts::TAU).round().max(1.0) as u32;
        let step_angle = span / steps as f32;
        let alpha = (4.0 / 3.0) * (step_angle / 4.0).tan();

        let point_at = |angle: f32| {
            center + Point::new(angle.cos(), angle.sin()) * radius
        };
        let tangent_at = |angle: f32| Point::new(-angle.sin(), angle.cos()) * radius;

        let first = point_at(start_angle);
        if self.has_current_point {
            self.line_to(first);
        } else {
            self.move_to(first);
        }

        let mut angle = start_angle;
        for _ in 0..steps {
            let p0 = point_at(angle);
            let next_angle = angle + step_angle;
            let p1 = point_at(next_angle);
            let c1 = p0 + tangent_at(angle) * alpha;
            let c2 = p1 - tangent_at(next_angle) * alpha;
            self.bezier_curve_to(c1, c2, p1);
            angle = next_angle;
        }
    }

    /// `arc_to`: a tangent-circle corner rounding between the current point
    /// and `(x1, y1)`, with the given radius, computed from the incoming
    /// edge `current -> (x1,y1)` and outgoing edge `(x1,y1) -> (x2,y2)`.
    /// Degenerates to a `line_to(vertex)` for near-collinear edges, whether
    /// the path runs straight through the vertex (incoming and outgoing
    /// rays antiparallel, `cos_half` near zero) or doubles back on itself
    /// (rays parallel, `sin_half` near zero); a no-op if radius is negative.
    pub fn arc_to(&mut self, vertex: Point, to: Point, radius: f32) {
        let Some(from) = self.current_point() else { return };
        if radius < 0.0 || !radius.is_finite() {
            return;
        }
        let in_dir = (from - vertex).normalized();
        let out_dir = (to - vertex).normalized();
        let cos_theta = clamp_unit(in_dir.dot(out_dir));
        let sin_half = ((1.0 - cos_theta) / 2.0).max(0.0).sqrt();
        let cos_half = cos_half_from_sin_half(sin_half);
        if sin_half.abs() < 1.0e-4 || cos_half.abs() < 1.0e-4 {
            self.line_to(vertex);
            return;
        }
        let dist = radius * cos_half / sin_half;
        let p1 = vertex + in_dir * dist;
        let p2 = vertex + out_dir * dist;

        let bisector = (in_dir + out_dir).normalized();
        let center_dist = radius / sin_half;
        let center = vertex + bisector * center_dist;

        let start_angle = (p1 - center).y.atan2((p1 - center).x);
        let end_angle = (p2 - center).y.atan2((p2 - center).x);
        let mut span = end_angle - start_angle;
        // Pick the arc on the side of the turn (short way round, signed by
        // the turn's orientation).
        let turn = in_dir.cross(out_dir);
        if turn >= 0.0 {
            while span <= 0.0 {
                span += std::f32::consts::TAU;
            }
            while span > std::f32::consts::TAU {
                span -= std::f32::consts::TAU;
            }
        } else {
            while span >= 0.0 {
                span -= std::f32::consts::TAU;
            }
            while span < -std::f32::consts::TAU {
                span += std::f32::consts::TAU;
            }
        }

        self.line_to(p1);
        self.arc(center, radius, start_angle, span);
    }

    /// Transforms `p` with `forward` before appending via `f`. Used by the
    /// public API surface to lower user-space command arguments into
    /// device space at the point of the call (spec.md §3 invariant).
    pub fn transform_point(forward: &Affine, p: Point) -> Point {
        forward.apply(p)
    }
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    v.max(-1.0).min(1.0)
}

#[inline]
fn cos_half_from_sin_half(sin_half: f32) -> f32 {
    (1.0 - sin_half * sin_half).max(0.0).sqrt()
}
