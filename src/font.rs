//! Font face glue: glyph lookup, advance widths, and outline extraction via
//! `ttf-parser`, plus a best-effort kerning lookup across GPOS pair
//! adjustment, AAT `kern`, and legacy OpenType `kern` (spec.md §1, §9).
//!
//! The decoder itself (`ttf-parser`) is treated as an external producer;
//! this module only adapts its output into the path/point types the
//! rasterizer already uses, the same role `ttf-parser` plays for the
//! teacher's own text renderer.

use crate::geometry::Point;
use crate::path::Path;
use ttf_parser::{Face, GlyphId, OutlineBuilder, Tag};

/// An owned font face: raw bytes plus the collection index, re-parsed on
/// each access rather than held as a self-referential `Face<'static>` —
/// `Face::parse` only walks the table directory, so this stays cheap.
pub struct FontFace {
    data: Vec<u8>,
    index: u32,
}

impl FontFace {
    pub fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        Face::parse(&data, index).ok()?;
        Some(FontFace { data, index })
    }

    fn face(&self) -> Face<'_> {
        Face::parse(&self.data, self.index).expect("validated at construction")
    }

    pub fn units_per_em(&self) -> u16 {
        self.face().units_per_em()
    }

    /// The face's typographic ascender/descender, in font units, preferring
    /// `OS/2`'s `sTypoAscender`/`sTypoDescender` over `hhea` when present
    /// (spec.md §4.11 baseline placement).
    pub fn ascender_descender(&self) -> (i16, i16) {
        let face = self.face();
        match (face.typographic_ascender(), face.typographic_descender()) {
            (Some(a), Some(d)) => (a, d),
            _ => (face.ascender(), face.descender()),
        }
    }

    pub fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        self.face().glyph_index(ch)
    }

    /// The glyph's horizontal advance, in font units.
    pub fn advance(&self, glyph: GlyphId) -> u16 {
        self.face().glyph_hor_advance(glyph).unwrap_or(0)
    }

    /// Extracts a glyph's outline as a [`Path`], in font design units
    /// (y-up; the caller is expected to flip and scale into text space).
    pub fn outline(&self, glyph: GlyphId) -> Option<Path> {
        let mut builder = PathOutlineBuilder::default();
        self.face().outline_glyph(glyph, &mut builder)?;
        Some(builder.path)
    }

    /// Looks up a kerning adjustment (font units) for a glyph pair, trying
    /// GPOS pair positioning first, then the AAT/legacy `kern` table,
    /// returning the first source that has an entry (spec.md §9 decision).
    pub fn kerning(&self, left: GlyphId, right: GlyphId) -> i16 {
        self.gpos_pair_kerning(left, right)
            .or_else(|| self.kern_table_kerning(left, right))
            .unwrap_or(0)
    }

    fn kern_table_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        let face = self.face();
        let kern = face.tables().kern?;
        kern.subtables.into_iter().find_map(|subtable| subtable.glyphs_kerning(left, right))
    }

    /// Parses `GPOS` lookup type 2 (pair adjustment), subtable format 1
    /// only (glyph-pair list, not class-based format 2). Format 2 and any
    /// other lookup type fall through to `None` so the caller drops to the
    /// `kern` table instead, rather than attempting full OpenType Layout
    /// shaping.
    fn gpos_pair_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        let face = self.face();
        let data = face.raw_face().table(Tag::from_bytes(b"GPOS"))?;
        let reader = ByteReader::new(data);

        let lookup_list_offset = reader.u16_at(8)? as usize;
        let lookup_list = reader.slice_from(lookup_list_offset)?;
        let lookup_reader = ByteReader::new(lookup_list);
        let lookup_count = lookup_reader.u16_at(0)?;

        for i in 0..lookup_count {
            let lookup_offset = lookup_reader.u16_at(2 + 2 * i as usize)? as usize;
            let lookup = lookup_reader.slice_from(lookup_offset)?;
            let lookup_reader = ByteReader::new(lookup);
            let lookup_type = lookup_reader.u16_at(0)?;
            if lookup_type != 2 {
                continue;
            }
            let subtable_count = lookup_reader.u16_at(4)?;
            for s in 0..subtable_count {
                let subtable_offset = lookup_reader.u16_at(6 + 2 * s as usize)? as usize;
                let subtable = lookup_reader.slice_from(subtable_offset)?;
                if let Some(value) = pair_pos_format1(subtable, left, right) {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Format-1 pair positioning: a coverage table of "first glyphs", each
/// pointing to a list of (second glyph, value record) pairs. Only the
/// X-advance delta of the first glyph's value record is read, which is all
/// a horizontal kerning lookup needs.
fn pair_pos_format1(subtable: &[u8], left: GlyphId, right: GlyphId) -> Option<i16> {
    let reader = ByteReader::new(subtable);
    let format = reader.u16_at(0)?;
    if format != 1 {
        return None;
    }
    let coverage_offset = reader.u16_at(2)? as usize;
    let value_format1 = reader.u16_at(4)?;
    let value_format2 = reader.u16_at(6)?;
    let pair_set_count = reader.u16_at(8)?;

    let index = coverage_index(reader.slice_from(coverage_offset)?, left)?;
    if index as u16 >= pair_set_count {
        return None;
    }
    let pair_set_offset = reader.u16_at(10 + 2 * index as usize)? as usize;
    let pair_set = reader.slice_from(pair_set_offset)?;
    let pair_reader = ByteReader::new(pair_set);
    let pair_count = pair_reader.u16_at(0)?;

    let rec1_len = value_record_len(value_format1);
    let rec2_len = value_record_len(value_format2);
    let pair_len = 2 + rec1_len + rec2_len;

    for i in 0..pair_count {
        let base = 2 + i as usize * pair_len;
        let second = pair_reader.u16_at(base)?;
        if second == right.0 {
            if value_format1 & 0x0004 == 0 {
                // No X-advance field present in this value record.
                return None;
            }
            return pair_reader.i16_at(base + 2);
        }
    }
    None
}

/// Sums the field widths (each 2 bytes) a GPOS `ValueFormat` bitmask says
/// are present, so the second value record in a pair can be skipped over.
fn value_record_len(format: u16) -> usize {
    2 * format.count_ones() as usize
}

/// Coverage table lookup (formats 1 and 2 only) returning the glyph's
/// index within the covered set, used to find which pair-set a "first
/// glyph" maps to.
fn coverage_index(data: &[u8], glyph: GlyphId) -> Option<u32> {
    let reader = ByteReader::new(data);
    let format = reader.u16_at(0)?;
    match format {
        1 => {
            let count = reader.u16_at(2)?;
            for i in 0..count {
                if reader.u16_at(4 + 2 * i as usize)? == glyph.0 {
                    return Some(i as u32);
                }
            }
            None
        }
        2 => {
            let range_count = reader.u16_at(2)?;
            for i in 0..range_count {
                let base = 4 + i as usize * 6;
                let start = reader.u16_at(base)?;
                let end = reader.u16_at(base + 2)?;
                let start_index = reader.u16_at(base + 4)?;
                if glyph.0 >= start && glyph.0 <= end {
                    return Some(start_index as u32 + (glyph.0 - start) as u32);
                }
            }
            None
        }
        _ => None,
    }
}

/// A minimal big-endian table reader over a borrowed byte slice, just
/// enough to walk the handful of OpenType Layout structures kerning needs.
struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ByteReader { data }
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes = self.data.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn i16_at(&self, offset: usize) -> Option<i16> {
        self.u16_at(offset).map(|v| v as i16)
    }

    fn slice_from(&self, offset: usize) -> Option<&'a [u8]> {
        self.data.get(offset..)
    }
}

/// Adapts `ttf-parser`'s `OutlineBuilder` callback interface into our own
/// cubic-Bezier-only [`Path`] (quadratics lower the same way `Path` already
/// lowers a caller's `quadratic_curve_to`).
#[derive(Default)]
struct PathOutlineBuilder {
    path: Path,
}

impl OutlineBuilder for PathOutlineBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(Point::new(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(Point::new(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.path.quadratic_curve_to(Point::new(x1, y1), Point::new(x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.path.bezier_curve_to(Point::new(x1, y1), Point::new(x2, y2), Point::new(x, y));
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}
