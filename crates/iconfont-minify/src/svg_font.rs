//! SVG font subsetting.

use std::{collections::HashMap, ops::Range};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{errors::SubsetError, UsedIcons};

/// `<glyph>` element in the source document.
#[derive(Debug)]
struct GlyphElement {
    name: Option<String>,
    /// Span of the element, from `<` to the end of the closing tag.
    span: Range<usize>,
    /// Start of the whitespace preceding the element.
    outer_start: usize,
}

impl GlyphElement {
    fn read_name(element: &BytesStart<'_>) -> Result<Option<String>, SubsetError> {
        for attr in element.attributes() {
            let attr = attr?;
            if attr.key.local_name().as_ref() == b"glyph-name" {
                return Ok(Some(attr.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }
}

/// SVG document containing a font, e.g. `fa-solid-900.svg`. Glyphs are looked up by their
/// `glyph-name` attribute.
///
/// The document is not re-serialized; subsetting removes `<glyph>` elements from the source
/// text and leaves all other content intact.
#[derive(Debug)]
pub struct SvgFontDocument<'a> {
    source: &'a str,
    glyphs: Vec<GlyphElement>,
    glyphs_by_name: HashMap<String, usize>,
}

impl<'a> SvgFontDocument<'a> {
    /// Parses the document. Only glyphs of the first `<font>` element are considered.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or contains no `<font>` element.
    pub fn parse(source: &'a str) -> Result<Self, SubsetError> {
        let mut reader = Reader::from_str(source);
        let mut font_depth = None::<usize>;
        let mut depth = 0_usize;
        let mut glyphs = vec![];

        loop {
            let event = reader.read_event()?;
            let (element, is_empty) = match &event {
                Event::Start(element) => (element, false),
                Event::Empty(element) => (element, true),
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if font_depth == Some(depth) {
                        break;
                    }
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            let in_font = font_depth.is_some_and(|font_depth| depth > font_depth);
            match element.local_name().as_ref() {
                b"font" if font_depth.is_none() => {
                    if is_empty {
                        return Ok(Self::new(source, glyphs));
                    }
                    font_depth = Some(depth);
                }
                b"glyph" if in_font => {
                    let name = GlyphElement::read_name(element)?;
                    // `<` cannot occur in attribute values, so the last `<` before the end
                    // of the start tag is the start of the element.
                    let tag_end = Self::position(&reader);
                    let start = source[..tag_end].rfind('<').unwrap_or(0);
                    if !is_empty {
                        reader.read_to_end(element.name())?;
                    }
                    let end = Self::position(&reader);
                    glyphs.push(GlyphElement {
                        name,
                        span: start..end,
                        outer_start: source[..start].trim_end().len(),
                    });
                    continue; // `read_to_end` has consumed the closing tag
                }
                _ => { /* other elements are retained as is */ }
            }
            if !is_empty {
                depth += 1;
            }
        }

        if font_depth.is_none() {
            return Err(SubsetError::MissingFont);
        }
        Ok(Self::new(source, glyphs))
    }

    fn position(reader: &Reader<&[u8]>) -> usize {
        usize::try_from(reader.buffer_position()).expect("position overflow")
    }

    fn new(source: &'a str, glyphs: Vec<GlyphElement>) -> Self {
        let mut glyphs_by_name = HashMap::new();
        for (i, glyph) in glyphs.iter().enumerate() {
            if let Some(name) = &glyph.name {
                glyphs_by_name.entry(name.clone()).or_insert(i);
            }
        }
        Self {
            source,
            glyphs,
            glyphs_by_name,
        }
    }

    /// Returns the number of glyphs in the font.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Returns the source of the first glyph with the specified name.
    pub fn glyph(&self, name: &str) -> Option<&'a str> {
        let &index = self.glyphs_by_name.get(name)?;
        Some(&self.source[self.glyphs[index].span.clone()])
    }

    /// Selects glyphs for the specified icons. Icons without a glyph are skipped.
    pub fn subset<'s>(&self, icons: impl IntoIterator<Item = &'s str>) -> SvgFontSubset<'_, 'a> {
        let glyph_indices = icons
            .into_iter()
            .filter_map(|icon| self.glyphs_by_name.get(icon).copied())
            .collect();
        SvgFontSubset {
            document: self,
            glyph_indices,
        }
    }

    /// Selects glyphs for the used icons.
    pub fn subset_used(&self, icons: &UsedIcons) -> SvgFontSubset<'_, 'a> {
        self.subset(icons.iter())
    }
}

/// Subset of an [`SvgFontDocument`].
#[derive(Debug)]
pub struct SvgFontSubset<'d, 'a> {
    document: &'d SvgFontDocument<'a>,
    glyph_indices: Vec<usize>,
}

impl SvgFontSubset<'_, '_> {
    /// Checks whether the subset contains no glyphs.
    pub fn is_empty(&self) -> bool {
        self.glyph_indices.is_empty()
    }

    /// Returns the number of glyphs in the subset.
    pub fn len(&self) -> usize {
        self.glyph_indices.len()
    }

    /// Iterates over names of the glyphs in the subset.
    pub fn glyph_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.glyph_indices
            .iter()
            .filter_map(|&i| self.document.glyphs[i].name.as_deref())
    }

    /// Serializes the subset. Selected glyphs are placed where the first glyph of the source
    /// document was, in the order of selection; all other content is copied verbatim.
    pub fn to_svg(&self) -> String {
        let source = self.document.source;
        let glyphs = &self.document.glyphs;
        let Some(first) = glyphs.first() else {
            return source.to_owned();
        };
        let separator = &source[first.outer_start..first.span.start];

        let mut svg = String::with_capacity(source.len());
        svg.push_str(&source[..first.outer_start]);
        for &i in &self.glyph_indices {
            svg.push_str(separator);
            svg.push_str(&source[glyphs[i].span.clone()]);
        }
        let mut pos = first.outer_start;
        for glyph in glyphs {
            svg.push_str(&source[pos..glyph.outer_start]);
            pos = glyph.span.end;
        }
        svg.push_str(&source[pos..]);
        svg
    }
}
