//! Compilation of SVG fonts into TrueType glyph data.

use kurbo::BezPath;

pub(crate) use self::glyph::{BoundingBox, Glyph, GlyphWithMetrics};
use crate::{
    errors::{SvgError, TranscodeError},
    svg::{SvgFont, SvgGlyph},
};

mod glyph;
mod outline;

/// SVG font with glyphs compiled to the `glyf` format.
#[derive(Debug)]
pub(crate) struct CompiledFont<'a> {
    pub(crate) font: &'a SvgFont,
    /// Glyphs in the order of their IDs; glyph 0 is `.notdef`.
    pub(crate) glyphs: Vec<GlyphWithMetrics>,
    /// Sorted by char.
    pub(crate) char_map: Vec<(char, u16)>,
    /// Union of all non-empty glyph boxes.
    pub(crate) bbox: Option<BoundingBox>,
    pub(crate) max_points: u16,
    pub(crate) max_contours: u16,
}

impl<'a> CompiledFont<'a> {
    pub(crate) fn new(font: &'a SvgFont) -> Result<Self, TranscodeError> {
        let glyph_count = font.glyphs.len() + 1;
        if glyph_count > usize::from(u16::MAX) {
            return Err(TranscodeError::TooManyGlyphs(glyph_count));
        }

        let notdef = match &font.missing_glyph {
            Some(glyph) => Self::compile_glyph(font, glyph, 0)?,
            None => GlyphWithMetrics::new(Glyph::default(), font.advance_of(&SvgGlyph::default())),
        };
        let mut glyphs = Vec::with_capacity(glyph_count);
        glyphs.push(notdef);
        for (i, svg_glyph) in font.glyphs.iter().enumerate() {
            glyphs.push(Self::compile_glyph(font, svg_glyph, i + 1)?);
        }

        let mut char_map = Vec::with_capacity(font.glyphs.len());
        for (i, svg_glyph) in font.glyphs.iter().enumerate() {
            if let Some(ch) = svg_glyph.mapped_char() {
                // `unwrap_or` never triggers: the glyph count is checked above
                char_map.push((ch, u16::try_from(i + 1).unwrap_or(u16::MAX)));
            }
        }
        // The stable sort retains the first glyph for duplicate chars.
        char_map.sort_by_key(|&(ch, _)| ch);
        char_map.dedup_by_key(|&mut (ch, _)| ch);

        let bbox = glyphs
            .iter()
            .filter_map(|glyph| glyph.inner.bbox)
            .reduce(BoundingBox::union);
        let max_points = glyphs.iter().map(|glyph| glyph.inner.point_count).max();
        let max_contours = glyphs.iter().map(|glyph| glyph.inner.contour_count).max();

        Ok(Self {
            font,
            glyphs,
            char_map,
            bbox,
            max_points: max_points.unwrap_or(0),
            max_contours: max_contours.unwrap_or(0),
        })
    }

    fn compile_glyph(
        font: &SvgFont,
        svg_glyph: &SvgGlyph,
        idx: usize,
    ) -> Result<GlyphWithMetrics, SvgError> {
        let path = svg_glyph
            .path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty());
        let glyph = if let Some(path) = path {
            let path = BezPath::from_svg(path).map_err(|source| SvgError::InvalidPath {
                glyph: svg_glyph
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("#{idx}")),
                source,
            })?;
            Glyph::new(&outline::contours(&path))
        } else {
            Glyph::default()
        };
        Ok(GlyphWithMetrics::new(glyph, font.advance_of(svg_glyph)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT: &str = r#"<svg><defs><font id="icons" horiz-adv-x="512">
        <font-face units-per-em="512" ascent="448" descent="-64"/>
        <glyph glyph-name="square" unicode="&#xf0c8;" d="M0 0h448v448h-448z"/>
        <glyph glyph-name="wide" unicode="&#xf015;" horiz-adv-x="576" d="M10 -20h566v100z"/>
        <glyph glyph-name="square-dup" unicode="&#xf0c8;" d="M0 0h10v10z"/>
        <glyph glyph-name="space" unicode=" "/>
    </font></defs></svg>"#;

    #[test]
    fn compiling_font() {
        let font = SvgFont::parse(FONT).unwrap();
        let compiled = CompiledFont::new(&font).unwrap();

        assert_eq!(compiled.glyphs.len(), 5);
        assert!(compiled.glyphs[0].inner.bbox.is_none());
        assert_eq!(compiled.glyphs[0].advance, 512);
        assert_eq!(compiled.glyphs[2].advance, 576);
        assert_eq!(compiled.glyphs[2].lsb, 10);
        assert!(compiled.glyphs[4].inner.data.is_empty());

        assert_eq!(
            compiled.char_map,
            [(' ', 4), ('\u{f015}', 2), ('\u{f0c8}', 1)]
        );
        assert_eq!(
            compiled.bbox,
            Some(BoundingBox {
                x_min: 0,
                y_min: -20,
                x_max: 576,
                y_max: 448,
            })
        );
        assert_eq!((compiled.max_points, compiled.max_contours), (4, 1));
    }

    #[test]
    fn invalid_path_is_reported_with_glyph_name() {
        let font = SvgFont::parse(
            r#"<svg><font><glyph glyph-name="broken" unicode="a" d="M0 0 L"/></font></svg>"#,
        )
        .unwrap();
        let err = CompiledFont::new(&font).unwrap_err();
        let TranscodeError::Svg(SvgError::InvalidPath { glyph, .. }) = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(glyph, "broken");
    }
}
