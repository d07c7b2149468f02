//! Paint sampling: solid colors, linear/radial gradients, and repeating
//! image patterns, each reduced to a per-point [`Color`] lookup (spec.md
//! §4.6).

use crate::color::Color;
use crate::geometry::{Affine, Point};

/// A gradient color stop. Stops must be supplied in non-decreasing
/// `offset` order; [`Paint::add_stop`] enforces this at insertion time by
/// simply appending (callers sort once after collecting all stops, as the
/// canvas API allows `add_color_stop` calls in any order).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRepeat {
    pub repeat_x: bool,
    pub repeat_y: bool,
}

impl PatternRepeat {
    pub const REPEAT: PatternRepeat = PatternRepeat { repeat_x: true, repeat_y: true };
    pub const REPEAT_X: PatternRepeat = PatternRepeat { repeat_x: true, repeat_y: false };
    pub const REPEAT_Y: PatternRepeat = PatternRepeat { repeat_x: false, repeat_y: true };
    pub const NO_REPEAT: PatternRepeat = PatternRepeat { repeat_x: false, repeat_y: false };
}

/// A source image backing a pattern paint: premultiplied linear-light
/// pixels in row-major order.
#[derive(Debug, Clone)]
pub struct PatternImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl PatternImage {
    pub fn get(&self, x: i32, y: i32) -> Color {
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied().unwrap_or(Color::TRANSPARENT)
    }
}

#[derive(Debug, Clone)]
pub enum Paint {
    Solid(Color),
    Linear { start: Point, end: Point, stops: Vec<GradientStop> },
    Radial { start: Point, start_radius: f32, end: Point, end_radius: f32, stops: Vec<GradientStop> },
    Pattern { image: PatternImage, repeat: PatternRepeat, is_raw_image: bool },
}

impl Paint {
    /// Samples this paint at a device-space point, given the current
    /// transform's inverse (gradients and patterns are evaluated in user
    /// space, per spec.md §4.6).
    pub fn sample(&self, device_point: Point, inverse: &Affine) -> Color {
        match self {
            Paint::Solid(c) => *c,
            Paint::Linear { start, end, stops } => {
                if stops.is_empty() {
                    return Color::TRANSPARENT;
                }
                let p = inverse.apply(device_point);
                let line = *end - *start;
                let span = line.dot(line);
                if span == 0.0 {
                    return Color::TRANSPARENT;
                }
                let t = (p - *start).dot(line) / span;
                sample_stops(stops, t)
            }
            Paint::Radial { start, start_radius, end, end_radius, stops } => {
                if stops.is_empty() {
                    return Color::TRANSPARENT;
                }
                let p = inverse.apply(device_point);
                match radial_offset(p, *start, *start_radius, *end, *end_radius) {
                    Some(t) => sample_stops(stops, t),
                    None => Color::TRANSPARENT,
                }
            }
            Paint::Pattern { image, repeat, is_raw_image } => {
                sample_pattern(image, *repeat, *is_raw_image, device_point, inverse)
            }
        }
    }
}

/// Solves the two-circle radial gradient equation for the larger-radius
/// root with a non-negative interpolated radius, matching the reference
/// rasterizer's degenerate-root handling exactly (spec.md §4.6, §9).
fn radial_offset(p: Point, start: Point, start_radius: f32, end: Point, end_radius: f32) -> Option<f32> {
    let relative = p - start;
    let line = end - start;
    let gradient = relative.dot(line);
    let span = line.dot(line);
    let change = end_radius - start_radius;
    let a = span - change * change;
    let b = -2.0 * (gradient + start_radius * change);
    let c = relative.dot(relative) - start_radius * start_radius;

    if a == 0.0 {
        if b == 0.0 {
            return None;
        }
        let t = -c / b;
        return (start_radius + change * t >= 0.0).then_some(t);
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let recip = 1.0 / (2.0 * a);
    let t1 = (-b - root) * recip;
    let t2 = (-b + root) * recip;
    let r1 = start_radius + change * t1;
    let r2 = start_radius + change * t2;
    if r2 >= 0.0 {
        Some(t2)
    } else if r1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Looks up the color at gradient parameter `t` via binary search
/// (`upper_bound` on stop offsets), clamping to the first/last stop outside
/// `[stops[0].offset, stops[last].offset]` and linearly mixing between
/// neighbors otherwise.
fn sample_stops(stops: &[GradientStop], t: f32) -> Color {
    let idx = stops.partition_point(|s| s.offset <= t);
    if idx == 0 {
        return stops[0].color;
    }
    if idx == stops.len() {
        return stops[stops.len() - 1].color;
    }
    let lo = &stops[idx - 1];
    let hi = &stops[idx];
    let span = hi.offset - lo.offset;
    let mix = if span > 0.0 { (t - lo.offset) / span } else { 0.0 };
    lo.color.lerp(hi.color, mix)
}

/// Samples a repeating pattern with a small Mitchell-Netravali-like
/// reconstruction kernel over a footprint sized from the current
/// transform's inverse scale, so a pattern minified by a large transform
/// doesn't alias (spec.md §4.6).
fn sample_pattern(image: &PatternImage, repeat: PatternRepeat, is_raw_image: bool, device_point: Point, inverse: &Affine) -> Color {
    if image.width == 0 || image.height == 0 {
        return Color::TRANSPARENT;
    }
    let w = image.width as f32;
    let h = image.height as f32;
    let mut point = inverse.apply(device_point);

    if !repeat.repeat_x && (point.x < 0.0 || point.x >= w) {
        return Color::TRANSPARENT;
    }
    if !repeat.repeat_y && (point.y < 0.0 || point.y >= h) {
        return Color::TRANSPARENT;
    }

    let scale_x = (inverse.a.abs() + inverse.c.abs()).clamp(1.0, w * 0.25);
    let scale_y = (inverse.b.abs() + inverse.d.abs()).clamp(1.0, h * 0.25);
    let recip_x = 1.0 / scale_x;
    let recip_y = 1.0 / scale_y;

    point = point - Point::new(0.5, 0.5);
    let left = (point.x - scale_x * 2.0).ceil() as i32;
    let right = (point.x + scale_x * 2.0).ceil() as i32;
    let top = (point.y - scale_y * 2.0).ceil() as i32;
    let bottom = (point.y + scale_y * 2.0).ceil() as i32;

    let mut total = Color::TRANSPARENT;
    let mut total_weight = 0.0f32;
    for py in top..bottom {
        let yf = (recip_y * (py as f32 - point.y)).abs();
        let weight_y = kernel(yf);
        let wrapped_y = if is_raw_image {
            (py.max(0) as u32).min(image.height - 1) as i32
        } else {
            py.rem_euclid(image.height as i32)
        };
        for px in left..right {
            let xf = (recip_x * (px as f32 - point.x)).abs();
            let weight_x = kernel(xf);
            let wrapped_x = if is_raw_image {
                (px.max(0) as u32).min(image.width - 1) as i32
            } else {
                px.rem_euclid(image.width as i32)
            };
            let weight = weight_x * weight_y;
            let c = image.get(wrapped_x, wrapped_y);
            total = Color::new(
                total.r + c.r * weight,
                total.g + c.g * weight,
                total.b + c.b * weight,
                total.a + c.a * weight,
            );
            total_weight += weight;
        }
    }
    if total_weight <= 0.0 {
        return Color::TRANSPARENT;
    }
    total.scale_alpha(1.0 / total_weight)
}

/// A piecewise cubic reconstruction kernel, matching the reference
/// rasterizer's pattern/image resampling filter.
#[inline]
fn kernel(x: f32) -> f32 {
    if x < 1.0 {
        (1.5 * x - 2.5) * x * x + 1.0
    } else {
        ((-0.5 * x + 2.5) * x - 4.0) * x + 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops() -> Vec<GradientStop> {
        vec![
            GradientStop { offset: 0.0, color: Color::new(1.0, 0.0, 0.0, 1.0) },
            GradientStop { offset: 1.0, color: Color::new(0.0, 0.0, 1.0, 1.0) },
        ]
    }

    #[test]
    fn linear_gradient_midpoint_is_mixed() {
        let paint = Paint::Linear { start: Point::new(0.0, 0.0), end: Point::new(10.0, 0.0), stops: stops() };
        let c = paint.sample(Point::new(5.0, 0.0), &Affine::IDENTITY);
        assert!((c.r - 0.5).abs() < 1.0e-5);
        assert!((c.b - 0.5).abs() < 1.0e-5);
    }

    #[test]
    fn linear_gradient_clamps_past_ends() {
        let paint = Paint::Linear { start: Point::new(0.0, 0.0), end: Point::new(10.0, 0.0), stops: stops() };
        let before = paint.sample(Point::new(-5.0, 0.0), &Affine::IDENTITY);
        let after = paint.sample(Point::new(50.0, 0.0), &Affine::IDENTITY);
        assert_eq!(before, stops()[0].color);
        assert_eq!(after, stops()[1].color);
    }

    #[test]
    fn radial_gradient_concentric_circles_grow_outward() {
        let paint = Paint::Radial {
            start: Point::new(0.0, 0.0),
            start_radius: 0.0,
            end: Point::new(0.0, 0.0),
            end_radius: 10.0,
            stops: stops(),
        };
        let center = paint.sample(Point::new(0.0, 0.0), &Affine::IDENTITY);
        let edge = paint.sample(Point::new(10.0, 0.0), &Affine::IDENTITY);
        assert_eq!(center, stops()[0].color);
        assert_eq!(edge, stops()[1].color);
    }

    #[test]
    fn no_repeat_pattern_is_transparent_outside_bounds() {
        let image = PatternImage { width: 2, height: 2, pixels: vec![Color::BLACK; 4] };
        let paint = Paint::Pattern { image, repeat: PatternRepeat::NO_REPEAT, is_raw_image: false };
        let outside = paint.sample(Point::new(100.0, 100.0), &Affine::IDENTITY);
        assert_eq!(outside, Color::TRANSPARENT);
    }
}
