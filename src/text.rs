//! Text glue: glyph-by-glyph advance, alignment/baseline shifts, and
//! optional pair kerning, layered on top of [`crate::font::FontFace`]
//! (spec.md §4.11).

use crate::font::FontFace;
use crate::geometry::{Affine, Point};
use crate::path::Path;
use crate::state::{TextAlign, TextBaseline};
use ttf_parser::GlyphId;

/// The DOM-`TextMetrics`-shaped measurement result (spec.md §9 supplement):
/// the original exposes more than total advance, and face metrics already
/// needed for baseline shifting make the rest free to compute.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f32,
    pub actual_ascent: f32,
    pub actual_descent: f32,
    pub font_ascent: f32,
    pub font_descent: f32,
}

/// Control characters that map to a plain space before layout, per
/// spec.md §4.11.
fn normalize_char(c: char) -> char {
    match c {
        '\t' | '\u{0B}' | '\u{0C}' | '\r' | '\n' => ' ',
        other => other,
    }
}

/// Walks a string's Unicode scalar values, looking up each glyph id and its
/// advance (scaled to `size` text-space units), consulting kerning between
/// consecutive pairs.
struct GlyphRun<'a> {
    face: &'a FontFace,
    scale: f32,
}

impl<'a> GlyphRun<'a> {
    fn new(face: &'a FontFace, size: f32) -> Self {
        GlyphRun { face, scale: size / face.units_per_em() as f32 }
    }

    fn layout(&self, text: &str) -> Vec<(GlyphId, f32)> {
        let mut glyphs: Vec<GlyphId> = text
            .chars()
            .map(normalize_char)
            .map(|c| self.face.glyph_id(c).unwrap_or(GlyphId(0)))
            .collect();
        if glyphs.is_empty() {
            glyphs.push(GlyphId(0));
            glyphs.pop();
        }
        let mut out = Vec::with_capacity(glyphs.len());
        for (i, &glyph) in glyphs.iter().enumerate() {
            let mut advance = self.face.advance(glyph) as f32;
            if i > 0 {
                advance += self.face.kerning(glyphs[i - 1], glyph) as f32;
            }
            out.push((glyph, advance * self.scale));
        }
        out
    }

    fn total_advance(&self, text: &str) -> f32 {
        self.layout(text).iter().map(|(_, adv)| *adv).sum()
    }
}

/// Computes the alignment offset (applied to the total advance) for the
/// horizontal start of text, given the paragraph direction is always
/// left-to-right (spec.md doesn't model bidi).
fn align_offset(align: TextAlign, total_advance: f32) -> f32 {
    match align {
        TextAlign::Start | TextAlign::Left => 0.0,
        TextAlign::End | TextAlign::Right => -total_advance,
        TextAlign::Center => -total_advance * 0.5,
    }
}

/// Computes the baseline's vertical offset from the em box, in font units
/// scaled to text space. Ascent/descent/line-gap come from `hhea`; the
/// alphabetic baseline is the origin (zero shift).
fn baseline_offset(baseline: TextBaseline, ascent: f32, descent: f32) -> f32 {
    match baseline {
        TextBaseline::Alphabetic => 0.0,
        TextBaseline::Top | TextBaseline::Hanging => ascent,
        TextBaseline::Middle => (ascent + descent) * 0.5,
        TextBaseline::Ideographic | TextBaseline::Bottom => descent,
    }
}

/// Appends every glyph outline of `text` into `path`, in device space: one
/// `(scale, advance-so-far)` transform per glyph composed with `base`, per
/// spec.md §4.11's save/compose/append/restore loop (here expressed as a
/// plain per-glyph transform instead of an explicit push/pop, since our
/// `Path` carries no transform state of its own).
pub fn layout_text_path(face: &FontFace, text: &str, size: f32, base: &Affine, align: TextAlign, baseline: TextBaseline, path: &mut Path) {
    let run = GlyphRun::new(face, size);
    let glyphs = run.layout(text);
    let total_advance: f32 = glyphs.iter().map(|(_, a)| *a).sum();

    let (ascent, descent) = font_ascent_descent(face, size);
    let x0 = align_offset(align, total_advance);
    let y0 = -baseline_offset(baseline, ascent, descent);

    let mut x = x0;
    for (glyph, advance) in glyphs {
        if let Some(outline) = face.outline(glyph) {
            // Glyph design space is y-up; flip to text space (y-down) and
            // scale by the font's units-per-em, then place at (x, y0).
            let glyph_transform = base.concat(&Affine::translation(x, y0)).concat(&Affine::scaling(run.scale, -run.scale));
            append_transformed(path, &outline, &glyph_transform);
        }
        x += advance;
    }
}

fn append_transformed(dest: &mut Path, source: &Path, transform: &Affine) {
    for sub in &source.subpaths {
        if sub.points.is_empty() {
            continue;
        }
        let pts: Vec<Point> = sub.points.iter().map(|p| transform.apply(*p)).collect();
        dest.move_to(pts[0]);
        let mut i = 1;
        while i + 2 < pts.len() {
            dest.bezier_curve_to(pts[i], pts[i + 1], pts[i + 2]);
            i += 3;
        }
        if sub.closed {
            dest.close_path();
        }
    }
}

fn font_ascent_descent(face: &FontFace, size: f32) -> (f32, f32) {
    let scale = size / face.units_per_em() as f32;
    let (ascender, descender) = face.ascender_descender();
    (ascender as f32 * scale, -descender as f32 * scale)
}

/// `measure_text`: total advance plus the DOM-`TextMetrics`-shaped
/// ascent/descent fields (spec.md §9 supplement).
pub fn measure_text(face: &FontFace, text: &str, size: f32) -> TextMetrics {
    let run = GlyphRun::new(face, size);
    let width = run.total_advance(text);
    let (ascent, descent) = font_ascent_descent(face, size);
    TextMetrics {
        width,
        actual_ascent: ascent,
        actual_descent: descent,
        font_ascent: ascent,
        font_descent: descent,
    }
}
