//! Property tests from spec.md §8, implemented as representative-case
//! `#[test]` functions rather than a QuickCheck-style generator (matching
//! the ambient testing style — see SPEC_FULL.md's Testing section).

use raster2d::path::Path;
use raster2d::scan::{self, FillRule, Run};
use raster2d::{Affine, BrushTarget, Canvas, CompositeOp, LineCap, LineJoin, Point};

fn pixel_at(canvas: &Canvas, x: i32, y: i32) -> [u8; 4] {
    let mut out = vec![0u8; 4];
    canvas.get_image_data(&mut out, 1, 1, 4, x, y);
    [out[0], out[1], out[2], out[3]]
}

fn full_image(canvas: &Canvas) -> Vec<u8> {
    let (w, h) = (canvas.width(), canvas.height());
    let mut out = vec![0u8; (w * h * 4) as usize];
    canvas.get_image_data(&mut out, w, h, w * 4, 0, 0);
    out
}

/// 1. Transform round-trip: a chain of translate/scale/rotate followed by
/// their inverses in reverse order collapses to the identity.
#[test]
fn transform_chain_followed_by_reverse_inverses_is_identity() {
    let translate = Affine::translation(12.0, -7.0);
    let scale = Affine::scaling(2.0, 0.5);
    let rotate = Affine::rotation(0.6);

    let forward = translate.concat(&scale).concat(&rotate);
    let restored = rotate
        .inverse()
        .unwrap()
        .concat(&scale.inverse().unwrap())
        .concat(&translate.inverse().unwrap())
        .concat(&forward);

    assert!((restored.a - 1.0).abs() < 1.0e-5);
    assert!((restored.d - 1.0).abs() < 1.0e-5);
    assert!(restored.b.abs() < 1.0e-5);
    assert!(restored.c.abs() < 1.0e-5);
    assert!(restored.e.abs() < 1.0e-4);
    assert!(restored.f.abs() < 1.0e-4);
}

/// 2. Path-point conservation: every subpath's point count stays ≡ 1 (mod 3)
/// through a mix of commands, including `close_path`.
#[test]
fn path_point_count_stays_one_mod_three() {
    let mut p = Path::new();
    p.move_to(Point::new(0.0, 0.0));
    p.line_to(Point::new(10.0, 0.0));
    p.quadratic_curve_to(Point::new(10.0, 5.0), Point::new(10.0, 10.0));
    p.bezier_curve_to(Point::new(8.0, 12.0), Point::new(4.0, 12.0), Point::new(0.0, 10.0));
    p.close_path();
    p.line_to(Point::new(5.0, 5.0));

    for sub in &p.subpaths {
        assert_eq!(sub.points.len() % 3, 1);
    }
}

/// 3. Even-odd flatten parity: a self-disjoint (non-convex, non-
/// self-intersecting) polygon's per-row signed coverage deltas sum to zero.
#[test]
fn self_disjoint_polygon_runs_sum_to_zero_per_row() {
    // An L-shaped hexagon.
    let l_shape = [
        Point::new(0.0, 0.0),
        Point::new(8.0, 0.0),
        Point::new(8.0, 4.0),
        Point::new(4.0, 4.0),
        Point::new(4.0, 8.0),
        Point::new(0.0, 8.0),
    ];
    let mut runs: Vec<Run> = Vec::new();
    for i in 0..l_shape.len() {
        let a = l_shape[i];
        let b = l_shape[(i + 1) % l_shape.len()];
        scan::generate_edge_runs(a, b, &mut runs);
    }
    let merged = scan::sort_and_coalesce(runs);
    for y in 0..8 {
        let row_sum: f32 = merged.iter().filter(|r| r.y == y).map(|r| r.delta).sum();
        assert!(row_sum.abs() < 1.0e-4, "row {y}: {row_sum}");
    }
}

/// 4. Stroke symmetry: stroking an open polyline and its reverse with a
/// symmetric cap (circle) and join (round) paint the same pixels.
#[test]
fn reversing_an_open_polyline_strokes_the_same_pixels() {
    let build = |reverse: bool| {
        let mut canvas = Canvas::new(40, 40).unwrap();
        canvas.set_color(BrushTarget::Stroke, 0.0, 0.0, 0.0, 1.0);
        canvas.set_line_width(6.0);
        canvas.set_line_cap(LineCap::Circle);
        canvas.set_line_join(LineJoin::Round);
        let pts = [Point::new(5.0, 5.0), Point::new(30.0, 10.0), Point::new(20.0, 32.0)];
        let order: Vec<Point> = if reverse { pts.iter().rev().copied().collect() } else { pts.to_vec() };
        canvas.move_to(order[0].x, order[0].y);
        for p in &order[1..] {
            canvas.line_to(p.x, p.y);
        }
        canvas.stroke();
        canvas
    };

    let forward = build(false);
    let backward = build(true);
    let a = full_image(&forward);
    let b = full_image(&backward);
    assert_eq!(a.len(), b.len());
    // Allow a thin sliver of antialiasing differences at cap/join boundaries
    // from floating-point operation order, without tolerating a real shape
    // mismatch.
    let mismatches = a.iter().zip(b.iter()).filter(|(x, y)| (**x as i32 - **y as i32).abs() > 4).count();
    let budget = a.len() / 200;
    assert!(mismatches <= budget, "{mismatches} differing bytes exceeds budget {budget}");
}

/// 5. Clip monotonicity: intersecting with a second clip never reveals a
/// pixel the first clip alone hid.
#[test]
fn intersecting_a_second_clip_never_reveals_new_pixels() {
    let mut only_a = Canvas::new(20, 20).unwrap();
    only_a.rectangle(2.0, 2.0, 10.0, 10.0);
    only_a.clip(FillRule::NonZero);
    only_a.set_color(BrushTarget::Fill, 0.0, 0.0, 0.0, 1.0);
    only_a.fill_rectangle(0.0, 0.0, 20.0, 20.0);

    let mut a_and_b = Canvas::new(20, 20).unwrap();
    a_and_b.rectangle(2.0, 2.0, 10.0, 10.0);
    a_and_b.clip(FillRule::NonZero);
    a_and_b.rectangle(6.0, 0.0, 10.0, 20.0);
    a_and_b.clip(FillRule::NonZero);
    a_and_b.set_color(BrushTarget::Fill, 0.0, 0.0, 0.0, 1.0);
    a_and_b.fill_rectangle(0.0, 0.0, 20.0, 20.0);

    for y in 0..20 {
        for x in 0..20 {
            let visible_both = pixel_at(&a_and_b, x, y)[3] > 0;
            let visible_a = pixel_at(&only_a, x, y)[3] > 0;
            if visible_both {
                assert!(visible_a, "({x},{y}) visible under both clips but not under A alone");
            }
        }
    }
}

/// 6. save/restore identity: state set between a save and its matching
/// restore rolls back, and restore itself never touches the bitmap.
#[test]
fn restore_rolls_back_state_without_touching_the_bitmap() {
    let mut canvas = Canvas::new(10, 10).unwrap();
    canvas.set_color(BrushTarget::Fill, 0.2, 0.4, 0.6, 1.0);
    canvas.fill_rectangle(0.0, 0.0, 10.0, 10.0);
    let before = full_image(&canvas);

    canvas.save();
    canvas.translate(3.0, 3.0);
    canvas.set_line_width(20.0);
    canvas.set_color(BrushTarget::Fill, 1.0, 0.0, 0.0, 1.0);
    canvas.restore();

    let after = full_image(&canvas);
    assert_eq!(before, after, "restore must not touch the bitmap by itself");

    canvas.fill_rectangle(0.0, 0.0, 2.0, 2.0);
    assert_eq!(pixel_at(&canvas, 0, 0)[0..3], [51, 102, 153][0..3]);
}

/// 7. Alpha readback round-trip: put then get on the same rectangle
/// reproduces the input within dither/linearization rounding.
#[test]
fn put_then_get_image_data_round_trips_within_dither_rounding() {
    let mut canvas = Canvas::new(8, 8).unwrap();
    let mut image = vec![0u8; 8 * 8 * 4];
    for i in 0..image.len() / 4 {
        image[i * 4] = (i * 7 % 256) as u8;
        image[i * 4 + 1] = (i * 13 % 256) as u8;
        image[i * 4 + 2] = (i * 29 % 256) as u8;
        image[i * 4 + 3] = 255;
    }
    canvas.put_image_data(&image, 8, 8, 8 * 4, 0, 0);

    let mut out = vec![0u8; image.len()];
    canvas.get_image_data(&mut out, 8, 8, 8 * 4, 0, 0);
    for (a, b) in image.iter().zip(out.iter()) {
        assert!((*a as i32 - *b as i32).abs() <= 1, "{a} vs {b}");
    }
}

/// 8. Composite "source-copy" idempotence: filling twice with `Copy`
/// matches filling once.
#[test]
fn copy_composite_fill_twice_matches_once() {
    let mut once = Canvas::new(10, 10).unwrap();
    once.set_global_composite_operation(CompositeOp::Copy);
    once.set_color(BrushTarget::Fill, 0.8, 0.1, 0.1, 0.6);
    once.fill_rectangle(0.0, 0.0, 10.0, 10.0);

    let mut twice = Canvas::new(10, 10).unwrap();
    twice.set_global_composite_operation(CompositeOp::Copy);
    twice.set_color(BrushTarget::Fill, 0.8, 0.1, 0.1, 0.6);
    twice.fill_rectangle(0.0, 0.0, 10.0, 10.0);
    twice.fill_rectangle(0.0, 0.0, 10.0, 10.0);

    assert_eq!(full_image(&once), full_image(&twice));
}

/// 9. Paint stop clamp: sampling a gradient past either end returns the
/// nearest stop's color exactly.
#[test]
fn gradient_fill_clamps_past_either_end() {
    let mut canvas = Canvas::new(40, 10).unwrap();
    canvas.set_linear_gradient(BrushTarget::Fill, 10.0, 5.0, 30.0, 5.0);
    canvas.add_color_stop(BrushTarget::Fill, 0.0, 1.0, 0.0, 0.0, 1.0);
    canvas.add_color_stop(BrushTarget::Fill, 1.0, 0.0, 0.0, 1.0, 1.0);
    canvas.fill_rectangle(0.0, 0.0, 40.0, 10.0);

    let before_start = pixel_at(&canvas, 0, 5);
    let after_end = pixel_at(&canvas, 39, 5);
    assert!(before_start[0] > before_start[2], "before the first stop should stay red-dominant");
    assert!(after_end[2] > after_end[0], "past the last stop should stay blue-dominant");
}

/// 10. Empty-path no-op: fill/stroke/clip/hit-test on an empty path leave
/// the bitmap untouched and report no hit.
#[test]
fn empty_path_operations_are_a_no_op() {
    let mut canvas = Canvas::new(10, 10).unwrap();
    canvas.set_color(BrushTarget::Fill, 1.0, 1.0, 1.0, 1.0);
    canvas.fill_rectangle(0.0, 0.0, 10.0, 10.0);
    let before = full_image(&canvas);

    canvas.begin_path();
    canvas.fill(FillRule::NonZero);
    canvas.stroke();
    canvas.clip(FillRule::NonZero);
    let hit = canvas.is_point_in_path(5.0, 5.0, FillRule::NonZero);

    assert_eq!(full_image(&canvas), before);
    assert!(!hit);
}
