//! An immediate-mode 2D vector graphics rasterizer with an HTML5
//! `CanvasRenderingContext2D`-shaped drawing model (spec.md).
//!
//! [`Canvas`] owns an RGBA bitmap and exposes the path, paint, transform,
//! and compositing primitives a browser canvas does, built out of the
//! scan-conversion, stroking, clipping, and text modules below. Nothing
//! here touches a display or a windowing system: the only output is the
//! bitmap itself, read back via [`Canvas::get_image_data`].

pub mod bezier;
pub mod clip;
pub mod color;
pub mod composite;
pub mod font;
pub mod geometry;
pub mod paint;
pub mod path;
pub mod pixel;
pub mod scan;
pub mod shadow;
pub mod state;
pub mod stroke;
pub mod text;

use std::rc::Rc;

pub use color::Color;
pub use composite::CompositeOp;
pub use geometry::{Affine, Point};
pub use paint::{GradientStop, PatternRepeat};
pub use scan::FillRule;
pub use state::{TextAlign, TextBaseline};
pub use stroke::{LineCap, LineJoin};
pub use text::TextMetrics;

use font::FontFace;
use paint::{Paint, PatternImage};
use path::Path;
use scan::Run;
use state::{DrawState, StateStack};
use stroke::StrokeStyle;

/// Which of a drawing state's two paints (and, by extension, two shadow
/// passes) an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushTarget {
    Fill,
    Stroke,
}

/// An immediate-mode canvas: a fixed-size RGBA bitmap plus the current
/// path and graphics state (spec.md §3).
pub struct Canvas {
    width: i32,
    height: i32,
    bitmap: Vec<Color>,
    path: Path,
    state: DrawState,
    stack: StateStack,
}

impl Canvas {
    /// The largest side length a canvas may have; chosen so `width *
    /// height` pixels of [`Color`] never overflows a reasonable address
    /// space (spec.md §3).
    pub const MAX_SIDE: i32 = 32768;

    /// Creates a new, fully transparent canvas. Returns `None` for a
    /// non-positive or oversized side.
    pub fn new(width: i32, height: i32) -> Option<Self> {
        if width < 1 || width > Self::MAX_SIDE || height < 1 || height > Self::MAX_SIDE {
            log::warn!("Canvas::new: rejecting {width}x{height}, outside [1, {}]", Self::MAX_SIDE);
            return None;
        }
        log::debug!("Canvas::new: {width}x{height}");
        Some(Canvas {
            width,
            height,
            bitmap: vec![Color::TRANSPARENT; (width as usize) * (height as usize)],
            path: Path::new(),
            state: DrawState::new(width, height),
            stack: StateStack::new(),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    // -- Transforms (spec.md §3) --------------------------------------

    pub fn set_transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        let forward = Affine::new(a, b, c, d, e, f);
        self.state.forward = forward;
        self.state.inverse = forward.inverse().unwrap_or(Affine::IDENTITY);
    }

    /// Composes `m` onto the current transform: `forward = forward * m`.
    pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.apply_transform(Affine::new(a, b, c, d, e, f));
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.apply_transform(Affine::translation(x, y));
    }

    pub fn scale(&mut self, x: f32, y: f32) {
        self.apply_transform(Affine::scaling(x, y));
    }

    pub fn rotate(&mut self, radians: f32) {
        self.apply_transform(Affine::rotation(radians));
    }

    fn apply_transform(&mut self, m: Affine) {
        let forward = self.state.forward.concat(&m);
        self.state.forward = forward;
        // A degenerate transform still builds paths (they're stored in
        // device space once transformed); it only disables fill/stroke,
        // via `Affine::IDENTITY` standing in for a missing inverse.
        match forward.inverse() {
            Some(inverse) => self.state.inverse = inverse,
            None => {
                log::trace!("transform became singular; fill/stroke disabled until it changes again");
                self.state.inverse = Affine::IDENTITY;
            }
        }
    }

    // -- Save/restore (spec.md §7) --------------------------------------

    pub fn save(&mut self) {
        self.stack.save(&self.state);
    }

    pub fn restore(&mut self) {
        self.stack.restore(&mut self.state);
    }

    // -- Graphics state setters ------------------------------------------

    /// A no-op outside `[0, 1]`, per spec.md §7: out-of-range values are
    /// rejected rather than clamped.
    pub fn set_global_alpha(&mut self, alpha: f32) {
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    pub fn set_global_composite_operation(&mut self, op: CompositeOp) {
        self.state.global_composite_operation = op;
    }

    pub fn set_shadow_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.state.shadow_color = Color::from_srgb_f32(r, g, b, a);
    }

    pub fn set_shadow_blur(&mut self, blur: f32) {
        if blur >= 0.0 {
            self.state.shadow_blur = blur;
        }
    }

    pub fn set_shadow_offset(&mut self, x: f32, y: f32) {
        self.state.shadow_offset = Point::new(x, y);
    }

    pub fn set_line_width(&mut self, width: f32) {
        if width > 0.0 {
            self.state.line_width = width;
        }
    }

    pub fn set_miter_limit(&mut self, limit: f32) {
        if limit > 0.0 {
            self.state.miter_limit = limit;
        }
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    pub fn set_line_join(&mut self, join: LineJoin) {
        self.state.line_join = join;
    }

    /// Rejects the whole array if any segment is negative or non-finite;
    /// an odd-length array is duplicated to even length; an empty slice
    /// clears dashing (spec.md §4.4).
    pub fn set_line_dash(&mut self, segments: &[f32]) {
        if segments.iter().any(|s| *s < 0.0 || !s.is_finite()) {
            return;
        }
        if segments.is_empty() {
            self.state.line_dash.clear();
            return;
        }
        let mut dash = segments.to_vec();
        if dash.len() % 2 == 1 {
            dash.extend_from_slice(segments);
        }
        self.state.line_dash = dash;
    }

    pub fn line_dash(&self) -> &[f32] {
        &self.state.line_dash
    }

    pub fn set_line_dash_offset(&mut self, offset: f32) {
        self.state.line_dash_offset = offset;
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.state.text_align = align;
    }

    pub fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state.text_baseline = baseline;
    }

    // -- Brush setters ----------------------------------------------------

    pub fn set_color(&mut self, target: BrushTarget, r: f32, g: f32, b: f32, a: f32) {
        self.set_paint(target, Paint::Solid(Color::from_srgb_f32(r, g, b, a)));
    }

    pub fn set_linear_gradient(&mut self, target: BrushTarget, x0: f32, y0: f32, x1: f32, y1: f32) {
        let paint = Paint::Linear { start: Point::new(x0, y0), end: Point::new(x1, y1), stops: Vec::new() };
        self.set_paint(target, paint);
    }

    /// No-op if either radius is negative.
    pub fn set_radial_gradient(&mut self, target: BrushTarget, x0: f32, y0: f32, r0: f32, x1: f32, y1: f32, r1: f32) {
        if r0 < 0.0 || r1 < 0.0 {
            return;
        }
        let paint = Paint::Radial { start: Point::new(x0, y0), start_radius: r0, end: Point::new(x1, y1), end_radius: r1, stops: Vec::new() };
        self.set_paint(target, paint);
    }

    /// No-op if `offset` is outside `[0, 1]`, or if the brush isn't
    /// already a gradient (a stop added to a solid color or pattern paint
    /// has nothing to attach to).
    pub fn add_color_stop(&mut self, target: BrushTarget, offset: f32, r: f32, g: f32, b: f32, a: f32) {
        if !(0.0..=1.0).contains(&offset) {
            return;
        }
        let color = Color::from_srgb_f32(r, g, b, a);
        let stops = match self.paint_mut(target) {
            Paint::Linear { stops, .. } | Paint::Radial { stops, .. } => stops,
            Paint::Solid(_) | Paint::Pattern { .. } => return,
        };
        stops.push(GradientStop { offset, color });
        stops.sort_by(|a, b| a.offset.partial_cmp(&b.offset).unwrap());
    }

    /// No-op if `width`/`height` aren't positive. Converts the packed
    /// sRGB bytes to premultiplied linear color eagerly, at set time.
    pub fn set_pattern(&mut self, target: BrushTarget, pixels: &[u8], width: i32, height: i32, stride: i32, repeat: PatternRepeat) {
        if width <= 0 || height <= 0 {
            return;
        }
        let image = decode_rgba(pixels, width, height, stride);
        self.set_paint(target, Paint::Pattern { image, repeat, is_raw_image: false });
    }

    fn set_paint(&mut self, target: BrushTarget, paint: Paint) {
        match target {
            BrushTarget::Fill => self.state.fill_paint = paint,
            BrushTarget::Stroke => self.state.stroke_paint = paint,
        }
    }

    fn paint_mut(&mut self, target: BrushTarget) -> &mut Paint {
        match target {
            BrushTarget::Fill => &mut self.state.fill_paint,
            BrushTarget::Stroke => &mut self.state.stroke_paint,
        }
    }

    // -- Path building (spec.md §3, §4.3) ---------------------------------

    pub fn begin_path(&mut self) {
        self.path.clear();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(self.state.forward.apply(Point::new(x, y)));
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(self.state.forward.apply(Point::new(x, y)));
    }

    pub fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let fwd = self.state.forward;
        self.path.quadratic_curve_to(fwd.apply(Point::new(cx, cy)), fwd.apply(Point::new(x, y)));
    }

    pub fn bezier_curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let fwd = self.state.forward;
        self.path.bezier_curve_to(fwd.apply(Point::new(c1x, c1y)), fwd.apply(Point::new(c2x, c2y)), fwd.apply(Point::new(x, y)));
    }

    pub fn close_path(&mut self) {
        self.path.close_path();
    }

    pub fn rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let fwd = self.state.forward;
        self.path.move_to(fwd.apply(Point::new(x, y)));
        self.path.line_to(fwd.apply(Point::new(x + width, y)));
        self.path.line_to(fwd.apply(Point::new(x + width, y + height)));
        self.path.line_to(fwd.apply(Point::new(x, y + height)));
        self.path.close_path();
    }

    /// Appends a user-space circular arc, each generated vertex
    /// transformed into device space individually (so a nonuniform
    /// transform turns the arc into an ellipse, spec.md §4.3) rather than
    /// transforming just its center.
    fn append_user_arc(&mut self, center: Point, radius: f32, start_angle: f32, span: f32) {
        let fwd = self.state.forward;
        let point_at = |a: f32| center + Point::new(a.cos(), a.sin()) * radius;
        let tangent_at = |a: f32| Point::new(-a.sin(), a.cos()) * radius;

        self.path.line_to(fwd.apply(point_at(start_angle)));
        if span == 0.0 {
            return;
        }
        let steps = (16.0 * span.abs() / std::f32::consts::TAU).round().max(1.0) as u32;
        let step_angle = span / steps as f32;
        let alpha = (4.0 / 3.0) * (step_angle * 0.25).tan();

        let mut angle = start_angle;
        for _ in 0..steps {
            let p0 = point_at(angle);
            let next_angle = angle + step_angle;
            let p1 = point_at(next_angle);
            let c1 = p0 + tangent_at(angle) * alpha;
            let c2 = p1 - tangent_at(next_angle) * alpha;
            self.path.bezier_curve_to(fwd.apply(c1), fwd.apply(c2), fwd.apply(p1));
            angle = next_angle;
        }
    }

    pub fn arc(&mut self, x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32, counterclockwise: bool) {
        if radius < 0.0 || !radius.is_finite() {
            return;
        }
        let tau = std::f32::consts::TAU;
        let winding = if counterclockwise { -1.0 } else { 1.0 };
        let from = start_angle % tau;
        let mut span = (end_angle % tau) - from;
        if (end_angle - start_angle) * winding >= tau {
            span = tau * winding;
        } else if span * winding < 0.0 {
            span += tau * winding;
        }
        self.append_user_arc(Point::new(x, y), radius, from, span);
    }

    /// Rounds the corner at `(x1, y1)` between the current point and
    /// `(x2, y2)` with the given radius. Degenerates to `line_to(x1, y1)`
    /// for near-collinear edges; a no-op for a negative radius.
    ///
    /// The tangent-circle construction itself is the same one
    /// [`path::Path::arc_to`] uses, just carried out in user space (via the
    /// current inverse transform) instead of device space, since the result
    /// has to go through [`Canvas::append_user_arc`] to handle a nonuniform
    /// transform correctly.
    pub fn arc_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) {
        if radius < 0.0 || !radius.is_finite() || self.state.forward.is_degenerate() {
            return;
        }
        if !self.path.has_current_point() {
            self.move_to(x1, y1);
            return;
        }
        let from = self.state.inverse.apply(self.path.current_point().unwrap());
        let vertex = Point::new(x1, y1);
        let to = Point::new(x2, y2);

        let in_dir = (from - vertex).normalized();
        let out_dir = (to - vertex).normalized();
        let cos_theta = in_dir.dot(out_dir).clamp(-1.0, 1.0);
        let sin_half = ((1.0 - cos_theta) / 2.0).max(0.0).sqrt();
        let cos_half = (1.0 - sin_half * sin_half).max(0.0).sqrt();
        if sin_half.abs() < 1.0e-4 || cos_half.abs() < 1.0e-4 {
            self.line_to(x1, y1);
            return;
        }
        let dist = radius * cos_half / sin_half;
        let p1 = vertex + in_dir * dist;
        let p2 = vertex + out_dir * dist;

        let bisector = (in_dir + out_dir).normalized();
        let center = vertex + bisector * (radius / sin_half);

        let start_angle = (p1 - center).y.atan2((p1 - center).x);
        let end_angle = (p2 - center).y.atan2((p2 - center).x);
        let mut span = end_angle - start_angle;
        let turn = in_dir.cross(out_dir);
        let tau = std::f32::consts::TAU;
        if turn >= 0.0 {
            while span <= 0.0 {
                span += tau;
            }
            while span > tau {
                span -= tau;
            }
        } else {
            while span >= 0.0 {
                span -= tau;
            }
            while span < -tau {
                span += tau;
            }
        }

        self.line_to(p1.x, p1.y);
        self.append_user_arc(center, radius, start_angle, span);
    }

    // -- Fill, stroke, clip, hit-testing -----------------------------------

    pub fn fill(&mut self, rule: FillRule) {
        let rings = flatten_to_lines(&self.path, bezier::ANGLE_DISABLED);
        self.render_main(&rings, BrushTarget::Fill, rule);
    }

    pub fn stroke(&mut self) {
        let rings = self.stroke_outline(&self.path);
        self.render_main(&rings, BrushTarget::Stroke, FillRule::NonZero);
    }

    pub fn clip(&mut self, rule: FillRule) {
        let rings = flatten_to_lines(&self.path, bezier::ANGLE_DISABLED);
        let shape_runs = rasterize_rings(&rings, self.width, self.height, Point::ZERO, 0);
        self.state.clip_mask = clip::intersect_clip(&shape_runs, &self.state.clip_mask, rule);
    }

    /// Device-space hit test: `(x, y)` is compared directly against the
    /// already-transformed path, with no further transform applied
    /// (spec.md §4.3, matching the reference rasterizer exactly).
    pub fn is_point_in_path(&self, x: f32, y: f32, rule: FillRule) -> bool {
        let rings = flatten_to_lines(&self.path, bezier::ANGLE_DISABLED);
        point_in_rings(&rings, Point::new(x, y), rule)
    }

    pub fn is_point_in_stroke(&self, x: f32, y: f32) -> bool {
        let rings = self.stroke_outline(&self.path);
        point_in_rings(&rings, Point::new(x, y), FillRule::NonZero)
    }

    /// Flattens `path` for stroking and expands it (dash, then offset) into
    /// closed outline rings, using the current stroke style and transform.
    fn stroke_outline(&self, path: &Path) -> Vec<(Vec<Point>, bool)> {
        let angular = bezier::stroke_angular_limit(self.state.line_width);
        let flattened = flatten_to_lines(path, angular);
        let style = self.stroke_style();
        let mut rings = Vec::new();
        for (points, closed) in &flattened {
            for (dashed_points, dashed_closed) in stroke::dash_polyline(points, *closed, &style.dash, style.dash_offset, &self.state.inverse) {
                let mut loops = Vec::new();
                stroke::stroke_subpath(&dashed_points, dashed_closed, &style, &self.state.forward, &self.state.inverse, &mut loops);
                rings.extend(loops.into_iter().map(|l| (l, true)));
            }
        }
        rings
    }

    fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle {
            width: self.state.line_width,
            miter_limit: self.state.miter_limit,
            join: self.state.line_join,
            cap: self.state.line_cap,
            dash: self.state.line_dash.clone(),
            dash_offset: self.state.line_dash_offset,
        }
    }

    // -- Rectangle shortcuts, which build their geometry directly rather
    // than going through the current path (spec.md §4.3) ------------------

    pub fn fill_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if width == 0.0 || height == 0.0 {
            return;
        }
        let rings = vec![(self.transformed_corners(x, y, width, height), true)];
        self.render_main(&rings, BrushTarget::Fill, FillRule::NonZero);
    }

    /// A no-op only when *both* `width` and `height` are zero; if exactly
    /// one is zero the rectangle degenerates to an open 2-point subpath
    /// (so caps still apply), matching the reference rasterizer exactly.
    pub fn stroke_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if width == 0.0 && height == 0.0 {
            return;
        }
        let fwd = self.state.forward;
        let (points, closed) = if width == 0.0 || height == 0.0 {
            (vec![fwd.apply(Point::new(x, y)), fwd.apply(Point::new(x + width, y + height))], false)
        } else {
            (self.transformed_corners(x, y, width, height), true)
        };
        let style = self.stroke_style();
        let mut rings = Vec::new();
        for (dashed_points, dashed_closed) in stroke::dash_polyline(&points, closed, &style.dash, style.dash_offset, &self.state.inverse) {
            let mut loops = Vec::new();
            stroke::stroke_subpath(&dashed_points, dashed_closed, &style, &self.state.forward, &self.state.inverse, &mut loops);
            rings.extend(loops.into_iter().map(|l| (l, true)));
        }
        self.render_main(&rings, BrushTarget::Stroke, FillRule::NonZero);
    }

    /// Erases a rectangle by filling it with `DestinationOut` under full
    /// opacity and no shadow, temporarily overriding those three bits of
    /// state (spec.md §4.9).
    pub fn clear_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if width == 0.0 || height == 0.0 {
            return;
        }
        let saved_op = self.state.global_composite_operation;
        let saved_alpha = self.state.global_alpha;
        let saved_shadow_alpha = self.state.shadow_color.a;
        let saved_fill = std::mem::replace(&mut self.state.fill_paint, Paint::Solid(Color::BLACK));
        self.state.global_composite_operation = CompositeOp::DestinationOut;
        self.state.global_alpha = 1.0;
        self.state.shadow_color.a = 0.0;

        self.fill_rectangle(x, y, width, height);

        self.state.global_composite_operation = saved_op;
        self.state.global_alpha = saved_alpha;
        self.state.shadow_color.a = saved_shadow_alpha;
        self.state.fill_paint = saved_fill;
    }

    fn transformed_corners(&self, x: f32, y: f32, width: f32, height: f32) -> Vec<Point> {
        let fwd = self.state.forward;
        vec![
            fwd.apply(Point::new(x, y)),
            fwd.apply(Point::new(x + width, y)),
            fwd.apply(Point::new(x + width, y + height)),
            fwd.apply(Point::new(x, y + height)),
        ]
    }

    // -- Text (spec.md §4.11) ----------------------------------------------

    /// Parses `data` as a TrueType/OpenType font and, if it's valid and
    /// `size` is a positive finite point size, makes it the active font.
    /// Leaves the previous font (if any) in place on failure.
    pub fn set_font(&mut self, data: &[u8], size: f32) -> bool {
        if !(size > 0.0 && size.is_finite()) {
            return false;
        }
        match FontFace::parse(data.to_vec(), 0) {
            Some(face) => {
                self.state.font = Some(Rc::new(face));
                self.state.font_size = size;
                true
            }
            None => {
                log::warn!("set_font: failed to parse {} bytes as a font face, keeping previous font", data.len());
                false
            }
        }
    }

    pub fn fill_text(&mut self, text: &str, x: f32, y: f32, max_width: Option<f32>) {
        let Some(face) = self.state.font.clone() else { return };
        let path = self.layout_glyph_path(&face, text, x, y, max_width);
        let rings = flatten_to_lines(&path, bezier::ANGLE_DISABLED);
        self.render_main(&rings, BrushTarget::Fill, FillRule::NonZero);
    }

    pub fn stroke_text(&mut self, text: &str, x: f32, y: f32, max_width: Option<f32>) {
        let Some(face) = self.state.font.clone() else { return };
        let path = self.layout_glyph_path(&face, text, x, y, max_width);
        let rings = self.stroke_outline(&path);
        self.render_main(&rings, BrushTarget::Stroke, FillRule::NonZero);
    }

    /// `measure_text` sums only glyph advances (consulting kerning, a
    /// deliberate extension beyond `hmtx`-only advance summing — see
    /// DESIGN.md); returns a zeroed [`TextMetrics`] while no font is set.
    pub fn measure_text(&self, text: &str) -> TextMetrics {
        match &self.state.font {
            Some(face) => text::measure_text(face, text, self.state.font_size),
            None => TextMetrics::default(),
        }
    }

    /// Builds the glyph outline path for `text` at `(x, y)` in the current
    /// transform, squeezing horizontally to fit `max_width` if given and
    /// exceeded (spec.md §4.11).
    fn layout_glyph_path(&self, face: &FontFace, text: &str, x: f32, y: f32, max_width: Option<f32>) -> Path {
        let size = self.state.font_size;
        let mut base = self.state.forward.concat(&Affine::translation(x, y));
        if let Some(max_width) = max_width {
            if max_width > 0.0 {
                let width = text::measure_text(face, text, size).width;
                if width > max_width {
                    base = base.concat(&Affine::scaling(max_width / width, 1.0));
                }
            }
        }
        let mut path = Path::new();
        text::layout_text_path(face, text, size, &base, self.state.text_align, self.state.text_baseline, &mut path);
        path
    }

    // -- Images (spec.md §4.7) ----------------------------------------------

    /// Draws a packed sRGB RGBA source image as a destination rectangle,
    /// by temporarily installing it as a raw (non-repeating, edge-clamped)
    /// pattern paint and filling that rectangle (spec.md §4.7).
    #[allow(clippy::too_many_arguments)]
    pub fn draw_image(&mut self, pixels: &[u8], width: i32, height: i32, stride: i32, x: f32, y: f32, to_width: f32, to_height: f32) {
        let Some(placement) = pixel::draw_image_placement(&self.state.forward, width, height, x, y, to_width, to_height) else { return };
        let Some(image_inverse) = placement.image_transform.inverse() else { return };

        let image = decode_rgba(pixels, width, height, stride);
        let saved_fill = std::mem::replace(&mut self.state.fill_paint, Paint::Pattern { image, repeat: PatternRepeat::NO_REPEAT, is_raw_image: true });
        let saved_inverse = std::mem::replace(&mut self.state.inverse, image_inverse);

        let rings = flatten_to_lines(&placement.destination, bezier::ANGLE_DISABLED);
        self.render_main(&rings, BrushTarget::Fill, FillRule::NonZero);

        self.state.fill_paint = saved_fill;
        self.state.inverse = saved_inverse;
    }

    pub fn get_image_data(&self, out: &mut [u8], width: i32, height: i32, stride: i32, x: i32, y: i32) {
        pixel::get_image_data(&self.bitmap, self.width, self.height, out, width, height, stride, x, y);
    }

    pub fn put_image_data(&mut self, image: &[u8], width: i32, height: i32, stride: i32, x: i32, y: i32) {
        pixel::put_image_data(&mut self.bitmap, self.width, self.height, image, width, height, stride, x, y);
    }

    // -- Rendering ----------------------------------------------------------

    /// Composites the antialiased coverage of `rings`, under `fill_rule`,
    /// using `target`'s paint, against the current clip mask — after first
    /// running the shadow pass underneath it (spec.md §4.9, §4.8 ordering).
    ///
    /// Walks the shape's runs and the clip mask's runs together exactly
    /// like [`clip::intersect_clip`], except it composites a pixel at a
    /// time instead of re-encoding a mask. Unlike the reference
    /// rasterizer's main loop, this doesn't skip zero-coverage pixels as
    /// a performance shortcut; every operator stays correct either way,
    /// since a zero-coverage, nonzero-visibility pixel is a no-op for the
    /// operators that would otherwise be skipped (see DESIGN.md).
    fn render_main(&mut self, rings: &[(Vec<Point>, bool)], target: BrushTarget, fill_rule: FillRule) {
        if self.state.forward.is_degenerate() {
            return;
        }
        self.render_shadow(rings, target);

        let path_runs = rasterize_rings(rings, self.width, self.height, Point::ZERO, 0);
        let mask_runs = self.state.clip_mask.clone();
        let paint = match target {
            BrushTarget::Fill => self.state.fill_paint.clone(),
            BrushTarget::Stroke => self.state.stroke_paint.clone(),
        };
        let op = self.state.global_composite_operation;
        let alpha = self.state.global_alpha;
        let inverse = self.state.inverse;

        let (mut i, mut j) = (0usize, 0usize);
        let mut cur_y = -1i32;
        let mut cur_x = 0i32;
        let (mut path_sum, mut mask_sum) = (0.0f32, 0.0f32);

        while j < mask_runs.len() {
            let take_path = i < path_runs.len() && scan::compare(path_runs[i], mask_runs[j]) == std::cmp::Ordering::Less;
            let next = if take_path { path_runs[i] } else { mask_runs[j] };

            let coverage = fill_rule.coverage(path_sum);
            let visibility = mask_sum.abs().min(1.0);
            let to_x = if next.y == cur_y { next.x } else { cur_x + 1 };

            if visibility > 0.0 && cur_y >= 0 && cur_y < self.height {
                for x in cur_x.max(0)..to_x.min(self.width) {
                    let idx = (cur_y * self.width + x) as usize;
                    let pixel_center = Point::new(x as f32 + 0.5, cur_y as f32 + 0.5);
                    let source = paint.sample(pixel_center, &inverse).scale_alpha(coverage * alpha);
                    composite::composite_pixel(&mut self.bitmap[idx], source, op, visibility);
                }
            }

            cur_x = next.x;
            if next.y != cur_y {
                cur_y = next.y;
                path_sum = 0.0;
                mask_sum = 0.0;
            }
            if take_path {
                path_sum += path_runs[i].delta;
                i += 1;
            } else {
                mask_sum += mask_runs[j].delta;
                j += 1;
            }
        }
    }

    /// Rasterizes `rings` into a padded, offset alpha grid, blurs it, and
    /// composites `shadow_color` through the clip mask using the blurred
    /// alpha (spec.md §4.8). A no-op while the shadow is fully transparent
    /// or has neither blur nor offset.
    ///
    /// The working grid spans the whole canvas padded by `border` pixels
    /// on every side rather than a tight bounding box of the shifted
    /// shape — a simplification that costs a little extra memory and
    /// blur work but keeps the index arithmetic trivial (see DESIGN.md).
    fn render_shadow(&mut self, rings: &[(Vec<Point>, bool)], target: BrushTarget) {
        let shadow_color = self.state.shadow_color;
        let shadow_blur = self.state.shadow_blur;
        let shadow_offset = self.state.shadow_offset;
        if shadow_color.a == 0.0 || (shadow_blur == 0.0 && shadow_offset.x == 0.0 && shadow_offset.y == 0.0) {
            return;
        }

        let radius = shadow::blur_radius(shadow_blur);
        let border = shadow::border_for_blur(radius);
        // Rasterizing the shape shifted by `border + shadow_offset` and
        // later reading the blurred grid back at `canvas + border` makes
        // the `shadow_offset` term cancel out exactly where it should:
        // the grid's own frame already carries the shadow's displacement.
        let offset = Point::new(border as f32 + shadow_offset.x, border as f32 + shadow_offset.y);
        let width_g = self.width + 2 * border;
        let height_g = self.height + 2 * border;
        if width_g <= 0 || height_g <= 0 {
            return;
        }

        let shadow_runs = rasterize_rings(rings, width_g, height_g, offset, 0);
        if shadow_runs.is_empty() {
            return;
        }

        let paint = match target {
            BrushTarget::Fill => self.state.fill_paint.clone(),
            BrushTarget::Stroke => self.state.stroke_paint.clone(),
        };
        let inverse = self.state.inverse;
        let alpha = self.state.global_alpha;
        let op = self.state.global_composite_operation;
        let w = width_g as usize;
        let h = height_g as usize;
        let mut grid = vec![0.0f32; w * h];

        let mut cur_y = -1i32;
        let mut cur_x = 0i32;
        let mut sum = 0.0f32;
        for run in &shadow_runs {
            let to_x = if run.y == cur_y { run.x } else { cur_x + 1 };
            let coverage = sum.abs().min(1.0);
            if coverage > 0.0 && cur_y >= 0 && cur_y < height_g {
                for x in cur_x.max(0)..to_x.min(width_g) {
                    let sample_point = Point::new(x as f32 + 0.5, cur_y as f32 + 0.5) - offset;
                    let sample_alpha = paint.sample(sample_point, &inverse).a;
                    grid[cur_y as usize * w + x as usize] = coverage * sample_alpha;
                }
            }
            cur_x = run.x;
            if run.y != cur_y {
                cur_y = run.y;
                sum = 0.0;
            }
            sum += run.delta;
        }

        let weights = shadow::blur_weights(shadow_blur, radius);
        shadow::blur_alpha_grid(&mut grid, w, h, weights);

        let mask_runs = self.state.clip_mask.clone();
        let mut cur_y = -1i32;
        let mut cur_x = 0i32;
        let mut mask_sum = 0.0f32;
        for run in &mask_runs {
            let to_x = if run.y == cur_y { run.x } else { cur_x + 1 };
            let visibility = mask_sum.abs().min(1.0);
            if visibility > 0.0 && cur_y >= 0 && cur_y < self.height {
                let gy = (cur_y + border) as usize;
                for x in cur_x.max(0)..to_x.min(self.width) {
                    let gx = (x + border) as usize;
                    let source = shadow_color.scale_alpha(alpha * grid[gy * w + gx]);
                    let idx = (cur_y * self.width + x) as usize;
                    composite::composite_pixel(&mut self.bitmap[idx], source, op, visibility);
                }
            }
            cur_x = run.x;
            if run.y != cur_y {
                cur_y = run.y;
                mask_sum = 0.0;
            }
            mask_sum += run.delta;
        }
    }
}

/// Flattens every non-empty subpath of `path` into a device-space point
/// ring, seeded with the subpath's start point, paired with its `closed`
/// flag (spec.md §4.2).
fn flatten_to_lines(path: &Path, angular: f32) -> Vec<(Vec<Point>, bool)> {
    let mut rings = Vec::with_capacity(path.subpaths.len());
    for sub in &path.subpaths {
        if sub.segment_count() == 0 {
            continue;
        }
        let mut pts = vec![sub.start()];
        for seg in 0..sub.segment_count() {
            let base = 1 + 3 * seg;
            let p0 = *pts.last().unwrap();
            bezier::flatten_cubic(p0, sub.points[base], sub.points[base + 1], sub.points[base + 2], angular, &mut pts);
        }
        rings.push((pts, sub.closed));
    }
    rings
}

/// Clips each ring (shifted by `offset`) against the canvas rectangle
/// padded by `border`, scan-converts its edges, and returns the merged,
/// sorted run list. Every ring is treated as closed regardless of its
/// `closed` flag, matching how the reference rasterizer always wraps a
/// flattened subpath's last point back to its first for scan conversion
/// and point-in-path testing alike (spec.md §4.5, see DESIGN.md).
fn rasterize_rings(rings: &[(Vec<Point>, bool)], width: i32, height: i32, offset: Point, border: i32) -> Vec<Run> {
    let mut runs = Vec::new();
    for (points, _closed) in rings {
        if points.len() < 2 {
            continue;
        }
        let shifted: Vec<Point> = points.iter().map(|p| *p + offset).collect();
        let clipped = scan::clip_polygon(&shifted, width as f32, height as f32, border as f32);
        if clipped.len() < 2 {
            continue;
        }
        let n = clipped.len();
        for i in 0..n {
            scan::generate_edge_runs(clipped[i], clipped[(i + 1) % n], &mut runs);
        }
    }
    scan::sort_and_coalesce(runs)
}

/// The ray-crossing winding test behind `is_point_in_path`/
/// `is_point_in_stroke`: every ring is treated as closed (same convention
/// as [`rasterize_rings`]), and a point exactly on an edge counts as a hit.
fn point_in_rings(rings: &[(Vec<Point>, bool)], p: Point, rule: FillRule) -> bool {
    let mut winding = 0.0f32;
    for (points, _closed) in rings {
        let n = points.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let from = points[i];
            let to = points[(i + 1) % n];
            if (from.y < p.y && p.y <= to.y) || (to.y < p.y && p.y <= from.y) {
                let side = (to - from).cross(p - from);
                if side == 0.0 {
                    return true;
                }
                winding += if side > 0.0 { 1.0 } else { -1.0 };
            } else if from.y == p.y && to.y == p.y {
                let (lo, hi) = (from.x.min(to.x), from.x.max(to.x));
                if p.x >= lo && p.x <= hi {
                    return true;
                }
            }
        }
    }
    rule.coverage(winding) > 0.0
}

/// Decodes a packed sRGB RGBA buffer (honoring `stride`) into a
/// premultiplied-linear [`PatternImage`], used by both `set_pattern` and
/// `draw_image`.
fn decode_rgba(pixels: &[u8], width: i32, height: i32, stride: i32) -> PatternImage {
    let mut out = vec![Color::TRANSPARENT; (width as usize) * (height as usize)];
    for y in 0..height {
        for x in 0..width {
            let idx = (y * stride + x * 4) as usize;
            if idx + 4 > pixels.len() {
                continue;
            }
            out[(y * width + x) as usize] = Color::from_srgb8(pixels[idx], pixels[idx + 1], pixels[idx + 2], pixels[idx + 3]);
        }
    }
    PatternImage { width: width as u32, height: height as u32, pixels: out }
}
