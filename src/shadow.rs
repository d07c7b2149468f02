//! Shadow blur: an extended three-pass box blur tuned to approximate a
//! Gaussian of a given blur radius (spec.md §4.8).
//!
//! The blur itself only touches a single alpha channel; the caller is
//! responsible for rasterizing the shape's coverage-weighted paint alpha
//! into a `width * height` grid (offset and padded by [`border_for_blur`])
//! before calling [`blur_alpha_grid`], and for compositing the blurred
//! alpha back against `shadow_color` afterward.

/// The two blend weights for the extended-box approximation of a Gaussian
/// with the given `radius` (in whole pixels) and blur amount.
#[derive(Debug, Clone, Copy)]
pub struct BlurWeights {
    pub radius: usize,
    pub weight_inner: f32,
    pub weight_outer: f32,
}

/// Derives the integer box radius from the canvas `shadowBlur` value: the
/// radius of a three-box running-sum blur whose variance matches a
/// Gaussian of standard deviation `blur / 2`.
pub fn blur_radius(blur: f32) -> usize {
    let sigma_squared = 0.25 * blur * blur;
    let r = 0.5 * (4.0 * sigma_squared + 1.0).sqrt() - 0.5;
    r.max(0.0) as usize
}

/// The padding, in device pixels, to add on every side of the shadow's
/// working raster so the blur has room to spread without clipping.
pub fn border_for_blur(radius: usize) -> i32 {
    3 * (radius as i32 + 1)
}

/// Computes the two extended-box blend weights (`alpha` split into an
/// inner `radius`-wide box and an outer `radius+1`-wide box) so that three
/// successive passes of this filter converge to a Gaussian of the given
/// blur's variance.
pub fn blur_weights(blur: f32, radius: usize) -> BlurWeights {
    let sigma_squared = 0.25 * blur * blur;
    let r = radius as f32;
    let alpha = (2.0 * r + 1.0) * (r * (r + 1.0) - sigma_squared)
        / (2.0 * sigma_squared - 6.0 * (r + 1.0) * (r + 1.0));
    let divisor = 2.0 * (alpha + r) + 1.0;
    BlurWeights { radius, weight_inner: (1.0 - alpha) / divisor, weight_outer: alpha / divisor }
}

/// One sliding-window box-blur pass over a 1D line, treating samples
/// outside `[0, len)` as zero.
fn box_blur_pass(src: &[f32], dst: &mut [f32], weights: BlurWeights) {
    let n = src.len();
    if n == 0 {
        return;
    }
    let radius = weights.radius;
    let (w1, w2) = (weights.weight_outer, weights.weight_inner);
    let at = |i: usize| -> f32 { if i < n { src[i] } else { 0.0 } };

    let mut running = w1 * at(radius + 1);
    for i in 0..=radius {
        running += (w1 + w2) * at(i);
    }
    dst[0] = running;
    for i in 1..n {
        if i >= radius + 1 {
            running -= w2 * at(i - radius - 1);
        }
        if i >= radius + 2 {
            running -= w1 * at(i - radius - 2);
        }
        running += w2 * at(i + radius);
        running += w1 * at(i + radius + 1);
        dst[i] = running;
    }
}

/// Three successive box-blur passes over one line, which converge to a
/// close approximation of a Gaussian blur of the matching sigma.
fn blur_line(line: &mut [f32], weights: BlurWeights) {
    let mut scratch = line.to_vec();
    for _ in 0..3 {
        let src = scratch.clone();
        box_blur_pass(&src, &mut scratch, weights);
    }
    line.copy_from_slice(&scratch);
}

/// Blurs a `width * height` row-major alpha grid in place: three
/// horizontal passes followed by three vertical passes.
pub fn blur_alpha_grid(grid: &mut [f32], width: usize, height: usize, weights: BlurWeights) {
    if width == 0 || height == 0 {
        return;
    }
    debug_assert_eq!(grid.len(), width * height);

    for y in 0..height {
        blur_line(&mut grid[y * width..(y + 1) * width], weights);
    }

    let mut column = vec![0.0f32; height];
    for x in 0..width {
        for y in 0..height {
            column[y] = grid[y * width + x];
        }
        blur_line(&mut column, weights);
        for y in 0..height {
            grid[y * width + x] = column[y];
        }
    }
}
