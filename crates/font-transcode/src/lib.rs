//! Compilation of SVG fonts to TrueType, and re-encoding of TrueType fonts
//! to WOFF, WOFF2 and EOT.
//!
//! # Examples
//!
//! ```
//! let svg = r#"<svg><defs><font id="icons" horiz-adv-x="512">
//!     <font-face units-per-em="512" ascent="448" descent="-64"/>
//!     <glyph glyph-name="square" unicode="&#xf0c8;" d="M0 0h448v448h-448z"/>
//! </font></defs></svg>"#;
//! let ttf = font_transcode::svg_to_ttf(svg)?;
//! let woff2 = font_transcode::ttf_to_woff2(&ttf)?;
//! assert_eq!(&woff2[..4], b"wOF2");
//!
//! let font = font_transcode::Font::new(&ttf)?;
//! assert_eq!(font.glyph_count(), 2);
//! assert_eq!(font.map_char('\u{f0c8}')?, 1);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

#![doc(html_root_url = "https://docs.rs/font-transcode/0.1.0")]

mod compile;
mod errors;
mod font;
mod svg;
#[cfg(test)]
pub(crate) mod tests;
mod write;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

pub use crate::{
    errors::{MapError, ParseError, ParseErrorKind, SvgError, TranscodeError},
    font::{Font, TableTag},
    svg::{SvgFont, SvgGlyph},
};

/// Compiles the first font defined in an SVG document to the TrueType format.
///
/// # Errors
///
/// Returns an error if the SVG font cannot be read or compiled.
pub fn svg_to_ttf(svg: &str) -> Result<Vec<u8>, TranscodeError> {
    SvgFont::parse(svg)?.to_truetype()
}

/// Re-encodes a TrueType font in the WOFF 1.0 format.
///
/// # Errors
///
/// Returns an error if the font cannot be parsed or compressed.
pub fn ttf_to_woff(ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    Font::new(ttf)?.to_woff()
}

/// Re-encodes a TrueType font in the WOFF2 format.
///
/// # Errors
///
/// Returns an error if the font cannot be parsed or compressed.
pub fn ttf_to_woff2(ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    Font::new(ttf)?.to_woff2()
}

/// Wraps a TrueType font into the Embedded OpenType format.
///
/// # Errors
///
/// Returns an error if the font cannot be parsed.
pub fn ttf_to_eot(ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    Ok(Font::new(ttf)?.to_eot()?)
}
