//! Font file references in stylesheets.

use std::{borrow::Cow, fmt};

/// Font format referenced by a style variant stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontFormat {
    /// SVG font. This is the source for all other formats.
    Svg,
    /// TrueType.
    Ttf,
    /// WOFF 1.0.
    Woff,
    /// WOFF 2.0.
    Woff2,
    /// Embedded OpenType.
    Eot,
}

impl fmt::Display for FontFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Svg => "SVG",
            Self::Ttf => "TrueType",
            Self::Woff => "WOFF",
            Self::Woff2 => "WOFF2",
            Self::Eot => "EOT",
        })
    }
}

impl FontFormat {
    /// All supported formats.
    pub const ALL: [Self; 5] = [Self::Svg, Self::Ttf, Self::Woff, Self::Woff2, Self::Eot];
    /// Binary formats generated from the SVG font.
    pub const BINARY: [Self; 4] = [Self::Ttf, Self::Woff, Self::Woff2, Self::Eot];

    /// Returns the file extension for this format (without the leading dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Ttf => "ttf",
            Self::Woff => "woff",
            Self::Woff2 => "woff2",
            Self::Eot => "eot",
        }
    }
}

/// Extracts the path to a file with the specified extension (without the leading dot)
/// from a stylesheet.
///
/// The path is the text preceding the first occurrence of the extension, up to the closest
/// quote or opening parenthesis (or the start of the stylesheet). The extension must not be
/// immediately followed by an alphanumeric char, so that e.g. `woff` does not match `.woff2`.
/// Query and fragment suffixes (`?v=1`, `#iefix`) are not included.
pub fn extract_file_path<'a>(extension: &str, css: &'a str) -> Option<&'a str> {
    let needle = format!(".{extension}");
    let mut search_start = 0;
    let end = loop {
        let pos = search_start + css[search_start..].find(&needle)?;
        let end = pos + needle.len();
        let is_boundary = css[end..]
            .chars()
            .next()
            .is_none_or(|ch| !ch.is_ascii_alphanumeric() && ch != '_');
        if is_boundary {
            break end;
        }
        search_start = end;
    };

    let start = css[..end]
        .rfind(['"', '\'', '('])
        .map_or(0, |quote_pos| quote_pos + 1);
    Some(css[start..end].trim_start())
}

/// Returns the file name of a path referenced in a stylesheet.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Font file references in a style variant stylesheet, e.g. in the `src` property
/// of an `@font-face` rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontReferences<'a> {
    paths: [Option<&'a str>; 5],
}

impl<'a> FontReferences<'a> {
    /// Extracts references for all [formats](FontFormat::ALL) from a stylesheet.
    pub fn extract(css: &'a str) -> Self {
        Self {
            paths: FontFormat::ALL.map(|format| extract_file_path(format.extension(), css)),
        }
    }

    /// Returns the referenced path for the specified format.
    pub fn path(&self, format: FontFormat) -> Option<&'a str> {
        // `ALL` lists formats in the declaration order.
        self.paths[format as usize]
    }

    /// Returns the file name of the referenced path for the specified format.
    pub fn file_name(&self, format: FontFormat) -> Option<&'a str> {
        self.path(format).map(file_name)
    }

    /// Rewrites every occurrence of the referenced paths in `css` to `./{file_name}`.
    /// Longer paths take precedence if paths overlap.
    pub fn rewrite<'s>(&self, css: &'s str) -> Cow<'s, str> {
        let mut paths: Vec<_> = self
            .paths
            .iter()
            .flatten()
            .copied()
            .filter(|path| !path.is_empty())
            .collect();
        if paths.is_empty() {
            return Cow::Borrowed(css);
        }
        paths.sort_unstable_by(|x, y| y.len().cmp(&x.len()).then_with(|| x.cmp(y)));
        paths.dedup();

        // Single left-to-right pass: rewritten text is never matched again.
        let mut rewritten = String::with_capacity(css.len());
        let mut rest = css;
        while !rest.is_empty() {
            if let Some(path) = paths.iter().find(|&&path| rest.starts_with(path)) {
                rewritten.push_str("./");
                rewritten.push_str(file_name(path));
                rest = &rest[path.len()..];
            } else {
                let char_len = rest.chars().next().map_or(1, char::len_utf8);
                rewritten.push_str(&rest[..char_len]);
                rest = &rest[char_len..];
            }
        }
        Cow::Owned(rewritten)
    }
}
