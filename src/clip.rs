//! Clip mask: a coalesced run list representing per-pixel visibility,
//! intersected against each new `clip()` call so it only ever shrinks
//! (spec.md §4.10).

use crate::scan::{compare, FillRule, Run};
use std::cmp::Ordering;

/// Builds the initial, unclipped mask: every row fully visible from `x=0`
/// to `x=width`.
pub fn full_mask(width: i32, height: i32) -> Vec<Run> {
    let mut mask = Vec::with_capacity(height as usize * 2);
    for y in 0..height {
        mask.push(Run { x: 0, y, delta: 1.0 });
        mask.push(Run { x: width, y, delta: -1.0 });
    }
    mask
}

/// Intersects a newly-rasterized shape's coverage runs with the current
/// clip mask, producing the runs for the new (smaller-or-equal) mask.
///
/// Walks both sorted run streams together, tracking each side's running
/// coverage sum per row and re-encoding the product `shape_rule.coverage(shape)
/// * min(|mask|,1)` as a fresh sequence of signed deltas at every x where
/// that product changes. The mask side is always treated as already-clamped
/// coverage (never raw winding), since it's itself the output of a prior
/// such intersection.
pub fn intersect_clip(shape_runs: &[Run], mask_runs: &[Run], shape_rule: FillRule) -> Vec<Run> {
    let (mut i, mut j) = (0usize, 0usize);
    let mut out: Vec<Run> = Vec::new();
    let mut cur_y = i32::MIN;
    let mut last = 0.0f32;
    let (mut sum_shape, mut sum_mask) = (0.0f32, 0.0f32);

    while i < shape_runs.len() && j < mask_runs.len() {
        let a = shape_runs[i];
        let b = mask_runs[j];
        let take_shape = compare(a, b) == Ordering::Less;
        let next = if take_shape { a } else { b };

        if next.y != cur_y {
            cur_y = next.y;
            last = 0.0;
            sum_shape = 0.0;
            sum_mask = 0.0;
        }
        if take_shape {
            sum_shape += a.delta;
            i += 1;
        } else {
            sum_mask += b.delta;
            j += 1;
        }

        let visibility = shape_rule.coverage(sum_shape) * sum_mask.abs().min(1.0);
        if visibility == last {
            continue;
        }
        if let Some(top) = out.last_mut() {
            if top.x == next.x && top.y == next.y {
                top.delta += visibility - last;
                last = visibility;
                continue;
            }
        }
        out.push(Run { x: next.x, y: next.y, delta: visibility - last });
        last = visibility;
    }
    out
}

/// Samples the clip mask's visibility at a given pixel by scanning its
/// row for the cumulative signed coverage up to and including `x`. Used by
/// `is_point_in_path`-style queries rather than the main composite loop,
/// which instead walks the mask in lockstep with the shape's own runs.
pub fn visibility_at(mask: &[Run], x: i32, y: i32) -> f32 {
    let mut sum = 0.0f32;
    for run in mask {
        if run.y != y {
            continue;
        }
        if run.x > x {
            break;
        }
        sum += run.delta;
    }
    sum.abs().min(1.0)
}
