//! End-to-end scenarios from spec.md §8 (S1-S6). The original scenarios are
//! checked against a regression harness's image fingerprints; without that
//! harness available here, each is instead checked against the qualitative
//! behavior its description calls for.

use std::f32::consts::TAU;

use raster2d::{BrushTarget, Canvas, CompositeOp, FillRule, LineCap};

fn pixel_at(canvas: &Canvas, x: i32, y: i32) -> [u8; 4] {
    let mut out = vec![0u8; 4];
    canvas.get_image_data(&mut out, 1, 1, 4, x, y);
    [out[0], out[1], out[2], out[3]]
}

fn circle_path(canvas: &mut Canvas, cx: f32, cy: f32, radius: f32) {
    canvas.arc(cx, cy, radius, 0.0, TAU, false);
    canvas.close_path();
}

/// S1 "scale_uniform": stroking an 8x8 rectangle while repeatedly doubling
/// the transform shouldn't panic at any scale and should leave paint near
/// the (moving) origin each time.
#[test]
fn s1_scale_uniform_strokes_at_every_doubling() {
    let mut canvas = Canvas::new(256, 256).unwrap();
    canvas.set_color(BrushTarget::Stroke, 0.0, 0.0, 0.0, 1.0);
    canvas.set_line_width(1.0);
    canvas.set_line_cap(LineCap::Circle);
    canvas.set_line_dash(&[1.0, 1.0]);

    let mut scale = 1.0f32;
    let mut painted_something = false;
    while scale <= 256.0 {
        canvas.set_transform(scale, 0.0, 0.0, scale, 0.0, 0.0);
        canvas.rectangle(0.0, 0.0, 8.0, 8.0);
        canvas.stroke();
        canvas.begin_path();
        scale *= 2.0;
    }
    for y in 0..256 {
        for x in 0..256 {
            if pixel_at(&canvas, x, y)[3] > 0 {
                painted_something = true;
            }
        }
    }
    assert!(painted_something);
}

/// S2 "linear_gradient": a filled-and-stroked circle under two
/// reciprocal gradients shows the fill color shift from the first to the
/// second gradient stop across its diagonal.
#[test]
fn s2_linear_gradient_varies_across_the_shape() {
    let (w, h) = (120, 120);
    let mut canvas = Canvas::new(w, h).unwrap();
    let (wf, hf) = (w as f32, h as f32);

    canvas.set_linear_gradient(BrushTarget::Fill, 0.3 * wf, 0.3 * hf, 0.7 * wf, 0.7 * hf);
    canvas.add_color_stop(BrushTarget::Fill, 0.0, 0.0, 0.8, 0.0, 1.0);
    canvas.add_color_stop(BrushTarget::Fill, 1.0, 1.0, 0.6, 0.8, 1.5);

    canvas.set_linear_gradient(BrushTarget::Stroke, 0.7 * wf, 0.7 * hf, 0.3 * wf, 0.3 * hf);
    canvas.add_color_stop(BrushTarget::Stroke, 0.0, 0.0, 0.8, 0.0, 1.0);
    canvas.add_color_stop(BrushTarget::Stroke, 1.0, 1.0, 0.6, 0.8, 1.5);
    canvas.set_line_width(16.0);

    let radius = 0.4 * wf.min(hf);
    circle_path(&mut canvas, wf / 2.0, hf / 2.0, radius);
    canvas.fill(FillRule::NonZero);
    canvas.stroke();

    let near_start = pixel_at(&canvas, (0.35 * wf) as i32, (0.35 * hf) as i32);
    let near_end = pixel_at(&canvas, (0.65 * wf) as i32, (0.65 * hf) as i32);
    assert_ne!(near_start, near_end, "fill gradient should vary across the shape");
}

/// S3 "shadow_blur_composite": clipping to a circle confines every later
/// draw (including the blurred shadow) to its interior.
#[test]
fn s3_shadow_and_composite_stay_within_the_clip() {
    let (w, h) = (100, 100);
    let mut canvas = Canvas::new(w, h).unwrap();
    let (wf, hf) = (w as f32, h as f32);
    let clip_radius = 0.5 * wf.min(hf);

    circle_path(&mut canvas, wf / 2.0, hf / 2.0, clip_radius);
    canvas.clip(FillRule::NonZero);

    canvas.set_color(BrushTarget::Fill, 0.0, 0.0, 1.0, 1.0);
    canvas.fill_rectangle(wf / 2.0 - 4.0, 10.0, 8.0, hf - 20.0);

    canvas.set_global_composite_operation(CompositeOp::DestinationAtop);
    canvas.set_color(BrushTarget::Stroke, 1.0, 0.0, 0.0, 1.0);
    canvas.set_line_width(15.0);
    canvas.set_line_dash(&[12.0, 6.0]);
    canvas.set_shadow_color(0.0, 0.0, 0.0, 1.0);
    canvas.set_shadow_blur(6.0);
    canvas.set_shadow_offset(5.0, 5.0);
    circle_path(&mut canvas, wf / 2.0, hf / 2.0, clip_radius * 0.7);
    canvas.stroke();

    canvas.set_global_composite_operation(CompositeOp::SourceOver);
    canvas.set_shadow_color(0.0, 0.0, 0.0, 0.0);
    circle_path(&mut canvas, wf / 2.0, hf / 2.0, clip_radius * 0.9);
    canvas.stroke();

    assert!(pixel_at(&canvas, (wf / 2.0) as i32, (hf / 2.0) as i32)[3] > 0);
    let corner = pixel_at(&canvas, 2, 2);
    assert_eq!(corner, [0, 0, 0, 0], "outside the clip circle must stay untouched");
}

/// S4 "fill_evenodd_star": a five-point star filled under even-odd leaves
/// an unfilled pentagon at its center but paints elsewhere.
#[test]
fn s4_even_odd_star_has_a_hollow_center() {
    let (w, h) = (100, 100);
    let mut canvas = Canvas::new(w, h).unwrap();
    let (cx, cy, r) = (w as f32 / 2.0, h as f32 / 2.0, 40.0);

    // A pentagram: connect every second vertex of a regular pentagon.
    let point = |i: i32| {
        let angle = -std::f32::consts::FRAC_PI_2 + (i as f32) * (TAU / 5.0);
        (cx + r * angle.cos(), cy + r * angle.sin())
    };
    let order = [0, 2, 4, 1, 3];
    canvas.set_color(BrushTarget::Fill, 0.0, 0.0, 0.0, 1.0);
    let (sx, sy) = point(order[0]);
    canvas.move_to(sx, sy);
    for &i in &order[1..] {
        let (x, y) = point(i);
        canvas.line_to(x, y);
    }
    canvas.close_path();
    canvas.fill(FillRule::EvenOdd);

    let mut filled = 0;
    for y in 0..h {
        for x in 0..w {
            if pixel_at(&canvas, x, y)[3] > 0 {
                filled += 1;
            }
        }
    }
    assert!(filled > 0);
    assert_eq!(pixel_at(&canvas, cx as i32, cy as i32), [0, 0, 0, 0], "pentagon center stays unfilled under even-odd");
}

/// S5 "draw_image matted": a tiny alternating red/blue source, stretched
/// across a range of sizes, keeps both colors distinguishable in the
/// output and never produces a fully invalid read-back.
#[test]
fn s5_draw_image_preserves_both_source_colors_when_scaled() {
    let source: Vec<u8> = {
        let mut px = Vec::new();
        for i in 0..9u8 {
            if i % 2 == 0 {
                px.extend_from_slice(&[220, 20, 20, 255]);
            } else {
                px.extend_from_slice(&[20, 20, 220, 255]);
            }
        }
        px
    };

    for size in [3.0, 12.0, 40.0, 86.0] {
        let mut canvas = Canvas::new(100, 100).unwrap();
        canvas.draw_image(&source, 3, 3, 12, 2.0, 2.0, size, size);

        let mut reddish = false;
        let mut bluish = false;
        let side = size as i32;
        for y in 0..side.max(1) {
            for x in 0..side.max(1) {
                let [r, _g, b, a] = pixel_at(&canvas, 2 + x, 2 + y);
                if a == 0 {
                    continue;
                }
                if r > b + 20 {
                    reddish = true;
                }
                if b > r + 20 {
                    bluish = true;
                }
            }
        }
        assert!(reddish && bluish, "size {size}: expected both red and blue regions to survive scaling");
    }
}

/// S6 "save_restore": a clip and color change made between `save` and
/// `restore` both roll back, so a later stroke uses the pre-save color and
/// ignores the never-restored clip.
#[test]
fn s6_restore_undoes_both_clip_and_color() {
    let mut canvas = Canvas::new(40, 40).unwrap();
    canvas.set_color(BrushTarget::Stroke, 0.0, 0.0, 1.0, 1.0); // blue, pre-save
    canvas.set_line_width(4.0);

    canvas.save();
    canvas.rectangle(5.0, 5.0, 10.0, 10.0);
    canvas.clip(FillRule::NonZero);
    canvas.set_color(BrushTarget::Stroke, 1.0, 0.0, 0.0, 1.0); // red, inside save
    canvas.restore();

    canvas.rectangle(0.0, 0.0, 40.0, 40.0);
    canvas.stroke();

    // A point on the outer rectangle's stroke, well outside the clip
    // rectangle that should no longer apply.
    let outside_old_clip = pixel_at(&canvas, 20, 1);
    assert!(outside_old_clip[3] > 0, "restore should have lifted the clip");
    assert!(outside_old_clip[2] > outside_old_clip[0], "restore should have brought back the blue stroke color");
}
