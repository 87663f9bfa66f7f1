//! Error types.

use std::{io, path::PathBuf};

use font_transcode::TranscodeError;

use crate::stylesheet::FontFormat;

/// Errors that can occur during minification.
///
/// Missing codepoints, missing SVG fonts and unused style variants are not errors;
/// they are reported via `tracing` if [debug output](crate::MinifyOptions::debug) is enabled.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Glob pattern for source files is invalid.
    #[error("invalid glob pattern `{pattern}`: {source}")]
    Glob {
        /// Full pattern (including the source directory).
        pattern: String,
        /// Pattern error.
        #[source]
        source: glob::PatternError,
    },
    /// Stylesheet classification pattern is not a valid regular expression.
    #[error("invalid stylesheet pattern `{pattern}`: {source}")]
    Pattern {
        /// Pattern source.
        pattern: String,
        /// Regex error.
        #[source]
        source: regex::Error,
    },
    /// Source directory is missing or is not a directory.
    #[error("cannot scan source directory `{}`: {source}", path.display())]
    SourceDir {
        /// Path to the directory.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: io::Error,
    },
    /// Error reading a source file, a stylesheet or an SVG font.
    #[error("failed reading `{}`: {source}", path.display())]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: io::Error,
    },
    /// Error writing a file to the staging directory.
    #[error("failed writing `{}`: {source}", path.display())]
    Write {
        /// Path to the file.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: io::Error,
    },
    /// Error creating or removing the staging directory.
    #[error("staging directory error: {0}")]
    Staging(#[source] io::Error),
    /// Main stylesheet does not contain the sentinel rule ending its base part.
    #[error("stylesheet `{}` contains no `{sentinel}` rule", path.display())]
    MissingBase {
        /// Path to the stylesheet.
        path: PathBuf,
        /// Sentinel class name, e.g. `fa-inverse`.
        sentinel: String,
    },
    /// SVG font referenced by a stylesheet cannot be parsed.
    #[error("cannot subset SVG font `{}`: {source}", path.display())]
    SvgFont {
        /// Path to the SVG font.
        path: PathBuf,
        /// Parsing error.
        #[source]
        source: SubsetError,
    },
    /// Error generating a binary font.
    #[error("failed generating {format} font from `{}`: {source}", path.display())]
    Transcode {
        /// Path to the source SVG font.
        path: PathBuf,
        /// Target format.
        format: FontFormat,
        /// Transcoding error.
        #[source]
        source: TranscodeError,
    },
}

/// Errors that can occur when parsing an SVG font for subsetting.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SubsetError {
    /// Document is not well-formed XML.
    #[error("malformed SVG document: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Document contains no `<font>` element.
    #[error("SVG document contains no `<font>` element")]
    MissingFont,
}

impl From<quick_xml::events::attributes::AttrError> for SubsetError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.into())
    }
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
