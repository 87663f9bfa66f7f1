//! SVG font reading.

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::errors::SvgError;

/// Glyph definition from an SVG font.
#[derive(Debug, Clone, Default)]
pub struct SvgGlyph {
    pub(crate) name: Option<String>,
    pub(crate) unicode: Option<String>,
    pub(crate) advance: Option<u16>,
    pub(crate) path: Option<String>,
}

impl SvgGlyph {
    /// Returns the `glyph-name` of this glyph.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the decoded `unicode` attribute of this glyph.
    pub fn unicode(&self) -> Option<&str> {
        self.unicode.as_deref()
    }

    /// Returns the single char this glyph is mapped to, if any. Ligature glyphs
    /// (with multiple chars in `unicode`) are not mapped.
    pub(crate) fn mapped_char(&self) -> Option<char> {
        let mut chars = self.unicode.as_deref()?.chars();
        let ch = chars.next()?;
        chars.next().is_none().then_some(ch)
    }

    fn read(element: &BytesStart<'_>) -> Result<Self, SvgError> {
        let mut glyph = Self::default();
        for attr in element.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?;
            match attr.key.local_name().as_ref() {
                b"glyph-name" => glyph.name = Some(value.into_owned()),
                b"unicode" => glyph.unicode = Some(value.into_owned()),
                b"horiz-adv-x" => glyph.advance = Some(parse_number("horiz-adv-x", &value)?),
                b"d" => glyph.path = Some(value.into_owned()),
                _ => { /* other attributes are not used */ }
            }
        }
        Ok(glyph)
    }
}

/// Font defined by the SVG `<font>` element.
#[derive(Debug, Clone)]
pub struct SvgFont {
    pub(crate) family_name: String,
    pub(crate) units_per_em: u16,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) weight: u16,
    pub(crate) italic: bool,
    pub(crate) underline_position: Option<i16>,
    pub(crate) underline_thickness: Option<i16>,
    pub(crate) default_advance: Option<u16>,
    pub(crate) missing_glyph: Option<SvgGlyph>,
    pub(crate) glyphs: Vec<SvgGlyph>,
}

/// Attributes of the `<font-face>` element.
#[derive(Debug, Default)]
struct FontFace {
    family_name: Option<String>,
    units_per_em: Option<u16>,
    ascent: Option<i16>,
    descent: Option<i16>,
    weight: Option<u16>,
    italic: bool,
    underline_position: Option<i16>,
    underline_thickness: Option<i16>,
}

impl FontFace {
    fn read(element: &BytesStart<'_>) -> Result<Self, SvgError> {
        let mut face = Self::default();
        for attr in element.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?;
            match attr.key.local_name().as_ref() {
                b"font-family" => {
                    face.family_name = Some(value.trim_matches(['"', '\'', ' ']).to_owned());
                }
                b"units-per-em" => face.units_per_em = Some(parse_number("units-per-em", &value)?),
                b"ascent" => face.ascent = Some(parse_number("ascent", &value)?),
                b"descent" => face.descent = Some(parse_number("descent", &value)?),
                b"font-weight" => face.weight = parse_weight(&value)?,
                b"font-style" => face.italic = matches!(&*value, "italic" | "oblique"),
                b"underline-position" => {
                    face.underline_position = Some(parse_number("underline-position", &value)?);
                }
                b"underline-thickness" => {
                    face.underline_thickness = Some(parse_number("underline-thickness", &value)?);
                }
                _ => { /* other attributes are not used */ }
            }
        }
        Ok(face)
    }
}

fn parse_number<T: TryFrom<i64>>(name: &'static str, value: &str) -> Result<T, SvgError> {
    let invalid = || SvgError::InvalidAttribute {
        name,
        value: value.to_owned(),
    };
    let number: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !number.is_finite() {
        return Err(invalid());
    }
    #[allow(clippy::cast_possible_truncation)] // checked by the conversion below
    let rounded = number.round() as i64;
    T::try_from(rounded).map_err(|_| invalid())
}

fn parse_weight(value: &str) -> Result<Option<u16>, SvgError> {
    Ok(match value.trim() {
        "normal" | "all" => None,
        "bold" => Some(700),
        other => Some(parse_number("font-weight", other)?),
    })
}

impl SvgFont {
    const DEFAULT_FAMILY_NAME: &'static str = "SVGFont";
    const DEFAULT_UNITS_PER_EM: u16 = 1_000;
    const DEFAULT_WEIGHT: u16 = 400;

    /// Parses the first `<font>` element of the provided SVG document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed, contains no `<font>` element,
    /// or has unparsable numeric attributes.
    pub fn parse(svg: &str) -> Result<Self, SvgError> {
        let mut reader = Reader::from_str(svg);
        let mut font_id = None::<String>;
        let mut default_advance = None;
        let mut face = None::<FontFace>;
        let mut missing_glyph = None;
        let mut glyphs = vec![];
        let mut found_font = false;
        let mut font_depth = None::<usize>;
        let mut depth = 0_usize;

        loop {
            let event = reader.read_event()?;
            let (element, is_empty) = match &event {
                Event::Start(element) => (element, false),
                Event::Empty(element) => (element, true),
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if font_depth == Some(depth) {
                        break; // only the first font is read
                    }
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            let in_font = font_depth.is_some_and(|font_depth| depth > font_depth);
            match element.local_name().as_ref() {
                b"font" if !found_font => {
                    found_font = true;
                    for attr in element.attributes() {
                        let attr = attr?;
                        match attr.key.local_name().as_ref() {
                            b"id" => font_id = Some(attr.unescape_value()?.into_owned()),
                            b"horiz-adv-x" => {
                                default_advance =
                                    Some(parse_number("horiz-adv-x", &attr.unescape_value()?)?);
                            }
                            _ => { /* other attributes are not used */ }
                        }
                    }
                    if is_empty {
                        break;
                    }
                    font_depth = Some(depth);
                }
                b"font-face" if in_font && face.is_none() => {
                    face = Some(FontFace::read(element)?);
                }
                b"missing-glyph" if in_font => {
                    missing_glyph = Some(SvgGlyph::read(element)?);
                }
                b"glyph" if in_font => glyphs.push(SvgGlyph::read(element)?),
                _ => { /* other elements are not used */ }
            }
            if !is_empty {
                depth += 1;
            }
        }

        if !found_font {
            return Err(SvgError::MissingFont);
        }

        let face = face.unwrap_or_default();
        let units_per_em = face
            .units_per_em
            .filter(|&units| units > 0)
            .unwrap_or(Self::DEFAULT_UNITS_PER_EM);
        let em = i32::from(units_per_em);
        let descent = face.descent.map_or(-(em / 5), |descent| -i32::from(descent).abs());
        let ascent = face.ascent.map_or(em + descent, i32::from);
        let family_name = face
            .family_name
            .or(font_id)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_FAMILY_NAME.to_owned());

        Ok(Self {
            family_name,
            units_per_em,
            ascent: clamp_i16(ascent),
            descent: clamp_i16(descent),
            weight: face.weight.unwrap_or(Self::DEFAULT_WEIGHT),
            italic: face.italic,
            underline_position: face.underline_position,
            underline_thickness: face.underline_thickness,
            default_advance,
            missing_glyph,
            glyphs,
        })
    }

    /// Returns the font family name.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Returns the number of units per em.
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Iterates over glyphs in the document order. The missing glyph is not included.
    pub fn glyphs(&self) -> impl ExactSizeIterator<Item = &SvgGlyph> + '_ {
        self.glyphs.iter()
    }

    /// Returns the subfamily name derived from weight and style.
    pub(crate) fn subfamily_name(&self) -> &'static str {
        match (self.weight >= 700, self.italic) {
            (false, false) => "Regular",
            (true, false) => "Bold",
            (false, true) => "Italic",
            (true, true) => "Bold Italic",
        }
    }

    pub(crate) fn advance_of(&self, glyph: &SvgGlyph) -> u16 {
        glyph
            .advance
            .or(self.default_advance)
            .unwrap_or(self.units_per_em)
    }
}

pub(crate) fn clamp_i16(value: i32) -> i16 {
    #[allow(clippy::cast_possible_truncation)] // clamped
    {
        value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
    }
}
