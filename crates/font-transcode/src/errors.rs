use core::{fmt, ops};
use std::{error, io};

use crate::TableTag;

/// Kind of a font [`ParseError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Unexpected font version.
    UnexpectedFontVersion,
    /// Missing required font table (e.g., `head`).
    MissingTable,
    /// No supported subtable in the `cmap` table.
    NoSupportedCmap,
    /// Offset inferred from the table data is out of bounds.
    OffsetOutOfBounds(usize),
    /// Range inferred from the table data is out of bounds.
    RangeOutOfBounds {
        /// Inferred range.
        range: ops::Range<usize>,
        /// Length of the indexed data.
        len: usize,
    },
    /// Unexpected table version.
    UnexpectedTableVersion {
        /// Version read from the table.
        version: u32,
    },
    /// Unexpected table length.
    UnexpectedTableLen {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Unexpected table format (e.g., for a `cmap` subtable).
    UnexpectedTableFormat {
        /// Format read from the table.
        format: u16,
    },
    /// Checksum mismatch.
    Checksum {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum read from the font data.
        actual: u32,
    },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnexpectedFontVersion => formatter.write_str("unexpected font version"),
            Self::MissingTable => formatter.write_str("missing required font table"),
            Self::NoSupportedCmap => {
                formatter.write_str("no supported subtable in the `cmap` table")
            }
            Self::OffsetOutOfBounds(val) => {
                write!(
                    formatter,
                    "offset ({val}) inferred from the table data is out of bounds"
                )
            }
            Self::RangeOutOfBounds { range, len } => {
                write!(
                    formatter,
                    "range ({range:?}) inferred from the table data is out of bounds (..{len})"
                )
            }
            Self::UnexpectedTableVersion { version } => {
                write!(formatter, "unexpected table version ({version})")
            }
            Self::UnexpectedTableLen { expected, actual } => {
                write!(
                    formatter,
                    "unexpected table length: expected {expected}, got {actual}"
                )
            }
            Self::UnexpectedTableFormat { format } => {
                write!(formatter, "unexpected table format ({format})")
            }
            Self::Checksum { expected, actual } => {
                write!(
                    formatter,
                    "unexpected checksum: expected {expected}, got {actual}"
                )
            }
        }
    }
}

impl error::Error for ParseErrorKind {}

/// Errors that can occur when parsing an OpenType [`Font`](crate::Font).
#[derive(Debug)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) offset: usize,
    pub(crate) table: Option<TableTag>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = self.table {
            write!(formatter, "[{table}] ")?;
        }
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

impl error::Error for ParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl ParseError {
    pub(crate) fn missing_table(tag: TableTag) -> Self {
        Self {
            kind: ParseErrorKind::MissingTable,
            offset: 0,
            table: Some(tag),
        }
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the table this error relates to.
    pub fn table(&self) -> Option<TableTag> {
        self.table
    }

    /// Gets the offset in the font data.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Errors that can occur when mapping a char to a glyph.
#[derive(Debug)]
#[non_exhaustive]
pub enum MapError {
    /// Char is not representable in the `cmap` subtable (e.g., it lies outside the BMP
    /// for a format 4 subtable).
    CharTooLarge,
    /// Glyph ID offset points outside the `cmap` subtable.
    InvalidOffset,
}

impl fmt::Display for MapError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::CharTooLarge => "char is not representable in the `cmap` subtable",
            Self::InvalidOffset => "glyph ID offset is out of bounds",
        })
    }
}

impl error::Error for MapError {}

/// Errors that can occur when reading an [`SvgFont`](crate::SvgFont).
#[derive(Debug)]
#[non_exhaustive]
pub enum SvgError {
    /// The document is not well-formed XML.
    Xml(quick_xml::Error),
    /// The document contains no `<font>` element.
    MissingFont,
    /// A numeric attribute cannot be parsed.
    InvalidAttribute {
        /// Attribute name.
        name: &'static str,
        /// Raw attribute value.
        value: String,
    },
    /// Path data of a glyph cannot be parsed.
    InvalidPath {
        /// Name of the glyph, or its position if the glyph is unnamed.
        glyph: String,
        /// Parsing error.
        source: kurbo::SvgParseError,
    },
}

impl fmt::Display for SvgError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml(err) => write!(formatter, "malformed SVG document: {err}"),
            Self::MissingFont => formatter.write_str("SVG document contains no `<font>` element"),
            Self::InvalidAttribute { name, value } => {
                write!(formatter, "invalid value for attribute `{name}`: {value:?}")
            }
            Self::InvalidPath { glyph, source } => {
                write!(formatter, "invalid path data for glyph `{glyph}`: {source}")
            }
        }
    }
}

impl error::Error for SvgError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Xml(err) => Some(err),
            Self::InvalidPath { source, .. } => Some(source),
            Self::MissingFont | Self::InvalidAttribute { .. } => None,
        }
    }
}

impl From<quick_xml::Error> for SvgError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err)
    }
}

impl From<quick_xml::events::attributes::AttrError> for SvgError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.into())
    }
}

/// Errors produced by the transcoding functions.
#[derive(Debug)]
#[non_exhaustive]
pub enum TranscodeError {
    /// Error reading the source SVG font.
    Svg(SvgError),
    /// Error reading the source TrueType font.
    Parse(ParseError),
    /// Error compressing font tables.
    Compress(io::Error),
    /// The font has more glyphs than TrueType can address.
    TooManyGlyphs(usize),
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Svg(err) => write!(formatter, "cannot read SVG font: {err}"),
            Self::Parse(err) => write!(formatter, "cannot read TrueType font: {err}"),
            Self::Compress(err) => write!(formatter, "cannot compress font tables: {err}"),
            Self::TooManyGlyphs(count) => {
                write!(formatter, "font has {count} glyphs; at most 65535 are supported")
            }
        }
    }
}

impl error::Error for TranscodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Svg(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Compress(err) => Some(err),
            Self::TooManyGlyphs(_) => None,
        }
    }
}

impl From<SvgError> for TranscodeError {
    fn from(err: SvgError) -> Self {
        Self::Svg(err)
    }
}

impl From<ParseError> for TranscodeError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}
