//! Pixel boundary conversions: packed 8-bit sRGB RGBA rows in and out of
//! the canvas's linear-light premultiplied bitmap, plus the geometry
//! `draw_image` needs to place a source image as a pattern-filled
//! rectangle (spec.md §6).

use crate::color::Color;
use crate::geometry::{Affine, Point};
use crate::path::Path;

/// Reads a rectangle of the canvas bitmap into a caller-owned packed RGBA
/// buffer, honoring the caller's `stride` (bytes per row) and placing the
/// canvas's `(x, y)` at the buffer's `(0, 0)`. Pixels of the requested
/// rectangle that fall outside the canvas read as transparent black;
/// dithered the same way final readback is (spec.md §8, property 7).
pub fn get_image_data(bitmap: &[Color], canvas_width: i32, canvas_height: i32, out: &mut [u8], width: i32, height: i32, stride: i32, x: i32, y: i32) {
    for img_y in 0..height {
        for img_x in 0..width {
            let idx = (img_y * stride + img_x * 4) as usize;
            if idx + 4 > out.len() {
                continue;
            }
            let cx = x + img_x;
            let cy = y + img_y;
            let color = if cx >= 0 && cx < canvas_width && cy >= 0 && cy < canvas_height {
                bitmap[(cy * canvas_width + cx) as usize]
            } else {
                Color::TRANSPARENT
            };
            let pixel = color.to_srgb8_dithered(cx.max(0) as u32, cy.max(0) as u32);
            out[idx..idx + 4].copy_from_slice(&pixel);
        }
    }
}

/// Writes a caller-provided packed RGBA rectangle into the canvas bitmap,
/// linearizing and premultiplying on entry. Pixels of the source rectangle
/// that fall outside the canvas are silently skipped.
pub fn put_image_data(bitmap: &mut [Color], canvas_width: i32, canvas_height: i32, image: &[u8], width: i32, height: i32, stride: i32, x: i32, y: i32) {
    for img_y in 0..height {
        for img_x in 0..width {
            let idx = (img_y * stride + img_x * 4) as usize;
            if idx + 4 > image.len() {
                continue;
            }
            let cx = x + img_x;
            let cy = y + img_y;
            if cx < 0 || cx >= canvas_width || cy < 0 || cy >= canvas_height {
                continue;
            }
            let color = Color::from_srgb8(image[idx], image[idx + 1], image[idx + 2], image[idx + 3]);
            bitmap[(cy * canvas_width + cx) as usize] = color;
        }
    }
}

/// The destination rectangle (in the current user-space transform) and the
/// additional translate+scale to compose onto the current transform before
/// rendering, for a `draw_image` call placing a `width` x `height` source
/// at `(x, y)` sized to `to_width` x `to_height`. Negative `to_width` or
/// `to_height` reflect the image about the corresponding axis, matching
/// the source's translate-by-min(0,size) then scale-by-abs(size)/source
/// construction.
pub struct DrawImagePlacement {
    pub destination: Path,
    pub image_transform: Affine,
}

pub fn draw_image_placement(forward: &Affine, source_width: i32, source_height: i32, x: f32, y: f32, to_width: f32, to_height: f32) -> Option<DrawImagePlacement> {
    if source_width <= 0 || source_height <= 0 || to_width == 0.0 || to_height == 0.0 {
        return None;
    }
    let mut destination = Path::new();
    destination.move_to(forward.apply(Point::new(x, y)));
    destination.line_to(forward.apply(Point::new(x + to_width, y)));
    destination.line_to(forward.apply(Point::new(x + to_width, y + to_height)));
    destination.line_to(forward.apply(Point::new(x, y + to_height)));
    destination.close_path();

    let translate = Affine::translation(x + to_width.min(0.0), y + to_height.min(0.0));
    let scale = Affine::scaling(to_width.abs() / source_width as f32, to_height.abs() / source_height as f32);
    let image_transform = forward.concat(&translate).concat(&scale);

    Some(DrawImagePlacement { destination, image_transform })
}
