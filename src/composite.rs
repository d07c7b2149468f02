//! Porter-Duff compositing (spec.md §4.9): blends a coverage-weighted
//! source color against a destination pixel under one of eleven operators.

use crate::color::Color;

/// The eleven composite operators the canvas API exposes. `SourceOver` is
/// the default painting mode; the rest trade which of source/destination
/// survives and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOp {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    SourceAtop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
}

/// The four term-selection flags for one operator: whether the source
/// term is scaled by the destination's alpha (rather than by 1), whether
/// that scale is inverted, and the same pair for the destination term.
/// Mirrors the reference rasterizer's 4-bit operator encoding (`operation &
/// 1/2/4/8`), spelled out per operator instead of packed into an integer.
struct MixFlags {
    fore_uses_back_alpha: bool,
    invert_fore: bool,
    back_uses_fore_alpha: bool,
    invert_back: bool,
}

fn mix_flags(op: CompositeOp) -> MixFlags {
    use CompositeOp::*;
    let (f, invf, b, invb) = match op {
        SourceIn => (true, false, false, false),
        Copy => (false, true, false, false),
        SourceOut => (true, true, false, false),
        DestinationIn => (false, false, true, false),
        DestinationAtop => (true, true, true, false),
        Lighter => (false, true, false, true),
        DestinationOver => (true, true, false, true),
        DestinationOut => (false, false, true, true),
        SourceAtop => (true, false, true, true),
        SourceOver => (false, true, true, true),
        Xor => (true, true, true, true),
    };
    MixFlags { fore_uses_back_alpha: f, invert_fore: invf, back_uses_fore_alpha: b, invert_back: invb }
}

/// Blends `source` over `dest` under `op`, then lerps that blend into
/// `dest` by `coverage` (the antialiased pixel coverage of the shape being
/// painted). `dest` is updated in place.
pub fn composite_pixel(dest: &mut Color, source: Color, op: CompositeOp, coverage: f32) {
    if coverage <= 0.0 {
        return;
    }
    let flags = mix_flags(op);
    let mut mix_fore = if flags.fore_uses_back_alpha { dest.a } else { 0.0 };
    let mut mix_back = if flags.back_uses_fore_alpha { source.a } else { 0.0 };
    if flags.invert_fore {
        mix_fore = 1.0 - mix_fore;
    }
    if flags.invert_back {
        mix_back = 1.0 - mix_back;
    }
    let mut blend = source.scale_alpha(mix_fore) + dest.scale_alpha(mix_back);
    blend.a = blend.a.min(1.0);

    let coverage = coverage.min(1.0);
    *dest = dest.lerp(blend, coverage);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_over_opaque_source_replaces_dest() {
        let mut dest = Color::new(0.0, 0.0, 1.0, 1.0);
        let source = Color::new(1.0, 0.0, 0.0, 1.0);
        composite_pixel(&mut dest, source, CompositeOp::SourceOver, 1.0);
        assert_eq!(dest, source);
    }

    #[test]
    fn source_over_partial_coverage_mixes() {
        let mut dest = Color::new(0.0, 0.0, 0.0, 1.0);
        let source = Color::new(1.0, 1.0, 1.0, 1.0);
        composite_pixel(&mut dest, source, CompositeOp::SourceOver, 0.5);
        assert!((dest.r - 0.5).abs() < 1.0e-5);
    }

    #[test]
    fn destination_out_erases_where_source_covers() {
        let mut dest = Color::new(1.0, 1.0, 1.0, 1.0);
        let source = Color::new(0.0, 0.0, 0.0, 1.0);
        composite_pixel(&mut dest, source, CompositeOp::DestinationOut, 1.0);
        assert!(dest.a < 1.0e-5);
    }

    #[test]
    fn copy_ignores_destination_outside_coverage_zero() {
        let mut dest = Color::new(0.2, 0.3, 0.4, 1.0);
        let source = Color::new(1.0, 0.0, 0.0, 0.5);
        composite_pixel(&mut dest, source, CompositeOp::Copy, 1.0);
        assert_eq!(dest, source);
    }

    #[test]
    fn lighter_adds_both_colors() {
        let mut dest = Color::new(0.2, 0.0, 0.0, 1.0);
        let source = Color::new(0.3, 0.0, 0.0, 1.0);
        composite_pixel(&mut dest, source, CompositeOp::Lighter, 1.0);
        assert!((dest.r - 0.5).abs() < 1.0e-5);
    }
}
