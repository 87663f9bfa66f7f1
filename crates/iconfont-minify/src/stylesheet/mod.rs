//! Stylesheet processing: codepoint rule extraction and font path rewriting.

use std::{borrow::Cow, collections::HashMap};

pub use self::paths::{extract_file_path, FontFormat, FontReferences};

mod paths;

/// Top-level rule of a stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CssRule<'a> {
    /// Selectors or an at-rule prelude, possibly with comments.
    pub(crate) prelude: &'a str,
    /// Contents of the rule block, without the enclosing braces.
    pub(crate) block: &'a str,
    /// Offset of the byte after the closing brace.
    pub(crate) end: usize,
}

impl<'a> CssRule<'a> {
    /// Returns comma-separated selectors with comments stripped.
    pub(crate) fn selectors(&self) -> Vec<String> {
        strip_comments(self.prelude)
            .split(',')
            .map(|selector| selector.trim().to_owned())
            .filter(|selector| !selector.is_empty())
            .collect()
    }

    /// Iterates over `(name, value)` declarations in the block.
    pub(crate) fn declarations(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.block.split(';').filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            Some((name.trim(), value.trim()))
        })
    }
}

fn strip_comments(css: &str) -> Cow<'_, str> {
    if !css.contains("/*") {
        return Cow::Borrowed(css);
    }
    let mut stripped = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        stripped.push_str(&rest[..start]);
        rest = rest[start + 2..]
            .find("*/")
            .map_or("", |end| &rest[start + 2 + end + 2..]);
    }
    stripped.push_str(rest);
    Cow::Owned(stripped)
}

/// Iterator over top-level rules of a stylesheet. Statements without a block (e.g., `@import`)
/// are skipped; nested rules are part of the block of the enclosing at-rule.
#[derive(Debug)]
pub(crate) struct CssRules<'a> {
    css: &'a str,
    pos: usize,
}

impl<'a> CssRules<'a> {
    pub(crate) fn new(css: &'a str) -> Self {
        Self { css, pos: 0 }
    }

    /// Skips a comment or a string literal starting at `pos`; returns the offset after it.
    fn skip_opaque(bytes: &[u8], pos: usize) -> Option<usize> {
        match bytes[pos] {
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                let end = bytes[pos + 2..]
                    .windows(2)
                    .position(|window| window == b"*/")
                    .map_or(bytes.len(), |end| pos + 2 + end + 2);
                Some(end)
            }
            quote @ (b'"' | b'\'') => {
                let mut i = pos + 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                Some((i + 1).min(bytes.len()))
            }
            _ => None,
        }
    }
}

impl<'a> Iterator for CssRules<'a> {
    type Item = CssRule<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.css.as_bytes();
        let mut prelude_start = self.pos;
        let mut i = self.pos;
        loop {
            if i >= bytes.len() {
                self.pos = bytes.len();
                return None;
            }
            if let Some(next) = Self::skip_opaque(bytes, i) {
                i = next;
                continue;
            }
            match bytes[i] {
                b'{' => break,
                b';' | b'}' => prelude_start = i + 1,
                _ => { /* part of the prelude */ }
            }
            i += 1;
        }

        let block_start = i + 1;
        let mut depth = 1_usize;
        i = block_start;
        let block_end = loop {
            if i >= bytes.len() {
                break bytes.len(); // unterminated block
            }
            if let Some(next) = Self::skip_opaque(bytes, i) {
                i = next;
                continue;
            }
            match bytes[i] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        break i;
                    }
                }
                _ => { /* part of the block */ }
            }
            i += 1;
        };

        let end = (block_end + 1).min(bytes.len());
        self.pos = end;
        Some(CssRule {
            prelude: &self.css[prelude_start..block_start - 1],
            block: &self.css[block_start..block_end],
            end,
        })
    }
}

/// Parses the `content` value of a codepoint rule, e.g. `"\f015"`, returning the hex digits.
fn parse_codepoint(content: &str) -> Option<&str> {
    let unquoted = content
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            content
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
        })?;
    let hex = unquoted.strip_prefix('\\')?;
    let is_valid = !hex.is_empty() && hex.len() <= 6 && hex.bytes().all(|b| b.is_ascii_hexdigit());
    is_valid.then_some(hex)
}

/// Result of [minimizing](MainStylesheet::minimize()) the main stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimizedStylesheet {
    /// Stylesheet contents.
    pub css: String,
    /// Used icons without a codepoint rule in the stylesheet.
    pub missing_icons: Vec<String>,
}

/// Main stylesheet of an icon font containing a codepoint rule for each icon,
/// e.g. `.fa-home:before { content: "\f015"; }`.
///
/// The stylesheet is split into the base part, which ends with the `.{prefix}-inverse` rule
/// and contains shared rules, and the codepoint rules following it.
#[derive(Debug)]
pub struct MainStylesheet<'a> {
    prefix: String,
    base: &'a str,
    codepoints: HashMap<String, &'a str>,
}

impl<'a> MainStylesheet<'a> {
    /// Returns the name of the class ending the base part of the stylesheet.
    pub fn sentinel(prefix: &str) -> String {
        format!("{prefix}-inverse")
    }

    /// Parses the stylesheet. Returns `None` if the stylesheet has no sentinel rule.
    pub fn parse(css: &'a str, prefix: &str) -> Option<Self> {
        let sentinel = Self::sentinel(prefix);
        let class_prefix = format!(".{prefix}-");
        let mut base_end = None;
        let mut codepoints = HashMap::new();

        for rule in CssRules::new(css) {
            let selectors = rule.selectors();
            if selectors
                .last()
                .is_some_and(|selector| selector.ends_with(&sentinel))
            {
                base_end = Some(rule.end);
            }

            let Some(codepoint) = rule
                .declarations()
                .find(|&(name, _)| name == "content")
                .and_then(|(_, value)| parse_codepoint(value))
            else {
                continue;
            };
            for selector in &selectors {
                let icon = selector
                    .strip_prefix(&class_prefix)
                    .and_then(|rest| {
                        rest.strip_suffix("::before")
                            .or_else(|| rest.strip_suffix(":before"))
                    });
                if let Some(icon) = icon {
                    codepoints.entry(icon.to_owned()).or_insert(codepoint);
                }
            }
        }

        Some(Self {
            prefix: prefix.to_owned(),
            base: &css[..base_end?],
            codepoints,
        })
    }

    /// Returns the base part of the stylesheet.
    pub fn base(&self) -> &'a str {
        self.base
    }

    /// Returns the hex codepoint for the specified icon, e.g. `"f015"` for `home`.
    pub fn codepoint(&self, icon: &str) -> Option<&'a str> {
        self.codepoints.get(icon).copied()
    }

    /// Returns the number of icons with a codepoint rule.
    pub fn icon_count(&self) -> usize {
        self.codepoints.len()
    }

    /// Minimizes the stylesheet so that it contains the base part and codepoint rules
    /// only for the specified icons, in the iteration order.
    pub fn minimize<'s>(&self, icons: impl IntoIterator<Item = &'s str>) -> MinimizedStylesheet {
        let mut css = self.base.to_owned();
        let mut missing_icons = vec![];
        for icon in icons {
            if let Some(codepoint) = self.codepoint(icon) {
                let prefix = &self.prefix;
                css.push_str(&format!(".{prefix}-{icon}:before{{content:\"\\{codepoint}\"}}"));
            } else {
                missing_icons.push(icon.to_owned());
            }
        }
        MinimizedStylesheet { css, missing_icons }
    }
}
