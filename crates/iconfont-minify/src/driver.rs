//! Minification driver reacting to resource resolution in a host build tool.

use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

use font_transcode::TranscodeError;
use regex::Regex;

use crate::{
    errors::{Error, Result},
    scanner::{ClassScanner, UsageCache, UsedIcons},
    staging::StagingArea,
    stylesheet::{FontFormat, FontReferences, MainStylesheet},
    svg_font::SvgFontDocument,
    MinifyOptions,
};

/// Resource resolved by the host build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Path to the resource file.
    pub path: PathBuf,
    /// Directory the resource is resolved in. Relative references in the resource
    /// (e.g., font URLs in a stylesheet) are resolved relative to this directory.
    pub context: PathBuf,
}

impl Resource {
    /// Creates a resource with the context set to the parent directory of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let context = path.parent().map(Path::to_owned).unwrap_or_default();
        Self { path, context }
    }
}

/// Instruction for the host to resolve a resource to another file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Path to the substituted file.
    pub path: PathBuf,
    /// New resolution context.
    pub context: PathBuf,
}

impl Redirect {
    /// Applies this redirect to the resource.
    pub fn apply(self, resource: &mut Resource) {
        resource.path = self.path;
        resource.context = self.context;
    }
}

/// Hooks invoked synchronously by the host build tool.
pub trait ResourceInterceptor {
    /// Called for each resolved resource. Returns a redirect if the resource should be
    /// substituted, or `None` if it should be used as is.
    ///
    /// # Errors
    ///
    /// Errors are fatal and should abort the build.
    fn on_resolve(&mut self, resource: &Resource) -> Result<Option<Redirect>>;

    /// Called once after all resources are resolved.
    ///
    /// # Errors
    ///
    /// Errors are fatal and should abort the build.
    fn on_complete(&mut self) -> Result<()>;
}

/// Generator of binary fonts from an SVG font.
pub trait FontTranscoder {
    /// Compiles an SVG font to TrueType.
    ///
    /// # Errors
    ///
    /// Returns an error if the SVG font cannot be compiled.
    fn svg_to_ttf(&self, svg: &str) -> Result<Vec<u8>, TranscodeError>;

    /// Re-encodes a TrueType font as WOFF.
    ///
    /// # Errors
    ///
    /// Returns an error if the font cannot be re-encoded.
    fn ttf_to_woff(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError>;

    /// Re-encodes a TrueType font as WOFF2.
    ///
    /// # Errors
    ///
    /// Returns an error if the font cannot be re-encoded.
    fn ttf_to_woff2(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError>;

    /// Wraps a TrueType font as EOT.
    ///
    /// # Errors
    ///
    /// Returns an error if the font cannot be wrapped.
    fn ttf_to_eot(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError>;
}

/// [`FontTranscoder`] based on the `font-transcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTranscoder;

impl FontTranscoder for BuiltinTranscoder {
    fn svg_to_ttf(&self, svg: &str) -> Result<Vec<u8>, TranscodeError> {
        font_transcode::svg_to_ttf(svg)
    }

    fn ttf_to_woff(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        font_transcode::ttf_to_woff(ttf)
    }

    fn ttf_to_woff2(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        font_transcode::ttf_to_woff2(ttf)
    }

    fn ttf_to_eot(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        font_transcode::ttf_to_eot(ttf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StylesheetKind {
    Main,
    Variant,
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })
}

fn file_name(path: &Path) -> Cow<'_, str> {
    path.file_name()
        .map_or(Cow::Borrowed(""), |name| name.to_string_lossy())
}

/// Build-scoped minifier of icon-font stylesheets and fonts.
///
/// The minifier handles two kinds of stylesheets, classified by their path:
///
/// - The main stylesheet is reduced to its base part and codepoint rules for the used icons.
/// - A style variant stylesheet references an SVG font and binary fonts generated from it.
///   The SVG font is reduced to the glyphs of used icons, binary fonts are regenerated
///   from the reduced SVG font, and font references are rewritten to the staged files.
///
/// Source files are scanned for used icons once, when the first stylesheet is resolved.
#[derive(Debug)]
pub struct Minifier<T = BuiltinTranscoder> {
    prefix: String,
    debug: bool,
    main_pattern: Regex,
    variant_pattern: Regex,
    usage: UsageCache,
    staging: StagingArea,
    transcoder: T,
    matched_any: bool,
    completed: bool,
}

impl Minifier {
    /// Creates a minifier with the specified options.
    ///
    /// # Errors
    ///
    /// Returns an error if the options contain invalid patterns, or the staging directory
    /// cannot be created.
    pub fn new(options: MinifyOptions) -> Result<Self> {
        Self::with_transcoder(options, BuiltinTranscoder)
    }
}

impl<T: FontTranscoder> Minifier<T> {
    /// Creates a minifier with a custom font transcoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the options contain invalid patterns, or the staging directory
    /// cannot be created.
    pub fn with_transcoder(options: MinifyOptions, transcoder: T) -> Result<Self> {
        let staging = StagingArea::create(options.debug)?;
        Self::from_parts(options, transcoder, staging)
    }

    /// Creates a minifier using the provided staging area.
    ///
    /// # Errors
    ///
    /// Returns an error if the options contain invalid patterns.
    pub fn from_parts(
        options: MinifyOptions,
        transcoder: T,
        staging: StagingArea,
    ) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| Error::Pattern {
                pattern: pattern.to_owned(),
                source,
            })
        };
        let main_pattern = compile(&options.main_stylesheet_pattern)?;
        let variant_pattern = compile(&options.variant_stylesheet_pattern)?;
        let scanner = ClassScanner::new(&options)?;

        Ok(Self {
            prefix: options.prefix,
            debug: options.debug,
            main_pattern,
            variant_pattern,
            usage: UsageCache::new(scanner),
            staging,
            transcoder,
            matched_any: false,
            completed: false,
        })
    }

    /// Returns the path to the staging directory.
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Returns the number of times source files were scanned (0 or 1).
    pub fn scan_count(&self) -> usize {
        self.usage.scan_count()
    }

    fn classify(&self, path: &Path) -> Option<StylesheetKind> {
        let path = path.to_string_lossy();
        if self.main_pattern.is_match(&path) {
            Some(StylesheetKind::Main)
        } else if self.variant_pattern.is_match(&path) {
            Some(StylesheetKind::Variant)
        } else {
            None
        }
    }

    fn redirect(&self, path: PathBuf) -> Redirect {
        Redirect {
            path,
            context: self.staging.path().to_owned(),
        }
    }

    fn process_main_stylesheet(
        &self,
        path: &Path,
        source: &str,
        used: &UsedIcons,
    ) -> Result<Redirect> {
        let stylesheet =
            MainStylesheet::parse(source, &self.prefix).ok_or_else(|| Error::MissingBase {
                path: path.to_owned(),
                sentinel: MainStylesheet::sentinel(&self.prefix),
            })?;
        let minimized = stylesheet.minimize(used.iter());
        if self.debug {
            for icon in &minimized.missing_icons {
                tracing::warn!(
                    resource = %path.display(),
                    icon = icon.as_str(),
                    "could not find codepoint for icon"
                );
            }
        }
        tracing::debug!(
            retained = used.len() - minimized.missing_icons.len(),
            total = stylesheet.icon_count(),
            "minimized main stylesheet"
        );

        let staged = self.staging.write(&file_name(path), &minimized.css)?;
        Ok(self.redirect(staged))
    }

    fn stage_empty(&self, path: &Path) -> Result<Redirect> {
        let staged = self.staging.write(&file_name(path), "")?;
        Ok(self.redirect(staged))
    }

    fn process_variant_stylesheet(
        &self,
        path: &Path,
        source: &str,
        used: &UsedIcons,
    ) -> Result<Redirect> {
        let references = FontReferences::extract(source);
        let svg_reference = references
            .path(FontFormat::Svg)
            .zip(references.file_name(FontFormat::Svg));
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let svg_path = svg_reference
            .map(|(svg_path, _)| dir.join(svg_path))
            .filter(|svg_path| svg_path.is_file());
        let (Some((_, svg_name)), Some(svg_path)) = (svg_reference, svg_path) else {
            if self.debug {
                tracing::info!(
                    svg = references.path(FontFormat::Svg),
                    "ignoring stylesheet referencing a missing SVG font"
                );
            }
            return self.stage_empty(path);
        };

        let svg_source = read_file(&svg_path)?;
        let document = SvgFontDocument::parse(&svg_source).map_err(|source| Error::SvgFont {
            path: svg_path.clone(),
            source,
        })?;
        let subset = document.subset_used(used);
        if subset.is_empty() {
            if self.debug {
                tracing::info!(svg = svg_name, "no glyphs of the SVG font are used");
            }
            return self.stage_empty(path);
        }
        tracing::debug!(
            retained = subset.len(),
            total = document.glyph_count(),
            "subsetted SVG font"
        );

        let svg = subset.to_svg();
        self.staging.write(svg_name, &svg)?;
        let css = references.rewrite(source);
        let staged_css = self.staging.write(&file_name(path), css.as_bytes())?;
        self.write_binary_fonts(&svg_path, svg_name, &svg, &references)?;
        Ok(self.redirect(staged_css))
    }

    fn write_binary_fonts(
        &self,
        svg_path: &Path,
        svg_name: &str,
        svg: &str,
        references: &FontReferences<'_>,
    ) -> Result<()> {
        let transcode_error = |format| {
            move |source| Error::Transcode {
                path: svg_path.to_owned(),
                format,
                source,
            }
        };
        let ttf = self
            .transcoder
            .svg_to_ttf(svg)
            .map_err(transcode_error(FontFormat::Ttf))?;
        let woff = self
            .transcoder
            .ttf_to_woff(&ttf)
            .map_err(transcode_error(FontFormat::Woff))?;
        let woff2 = self
            .transcoder
            .ttf_to_woff2(&ttf)
            .map_err(transcode_error(FontFormat::Woff2))?;
        let eot = self
            .transcoder
            .ttf_to_eot(&ttf)
            .map_err(transcode_error(FontFormat::Eot))?;

        let stem = svg_name.rsplit_once('.').map_or(svg_name, |(stem, _)| stem);
        let fonts = [
            (FontFormat::Ttf, ttf),
            (FontFormat::Woff, woff),
            (FontFormat::Woff2, woff2),
            (FontFormat::Eot, eot),
        ];
        for (format, data) in fonts {
            let name = references.file_name(format).map_or_else(
                || Cow::Owned(format!("{stem}.{}", format.extension())),
                Cow::Borrowed,
            );
            self.staging.write(&name, &data)?;
            tracing::debug!(%format, name = &*name, len = data.len(), "generated font");
        }
        Ok(())
    }
}

impl<T: FontTranscoder> ResourceInterceptor for Minifier<T> {
    fn on_resolve(&mut self, resource: &Resource) -> Result<Option<Redirect>> {
        let Some(kind) = self.classify(&resource.path) else {
            return Ok(None);
        };
        // Staged stylesheets match the same patterns as the originals.
        let staging_dir = self.staging.path();
        if resource.context == staging_dir || resource.path.starts_with(staging_dir) {
            return Ok(None);
        }
        self.matched_any = true;

        let span = tracing::info_span!("resolve", resource = %resource.path.display(), ?kind);
        let _entered = span.enter();

        let is_first_scan = self.usage.scan_count() == 0;
        let used = self.usage.get_or_scan()?;
        if self.debug && is_first_scan {
            tracing::info!(count = used.len(), icons = ?used.iter().collect::<Vec<_>>(), "detected icons");
        }
        if used.is_empty() {
            if self.debug {
                tracing::info!("did not find any icon classes; skipping minification");
            }
            return Ok(None);
        }

        let source = read_file(&resource.path)?;
        let redirect = match kind {
            StylesheetKind::Main => self.process_main_stylesheet(&resource.path, &source, &used),
            StylesheetKind::Variant => {
                self.process_variant_stylesheet(&resource.path, &source, &used)
            }
        }?;
        tracing::debug!(path = %redirect.path.display(), "redirected resource");
        Ok(Some(redirect))
    }

    fn on_complete(&mut self) -> Result<()> {
        if self.completed {
            return Ok(());
        }
        self.staging.close()?;
        self.completed = true;

        if self.debug {
            if !self.matched_any {
                tracing::warn!("could not find any icon-font stylesheet");
            }
            if self.staging.is_kept() {
                tracing::info!(
                    path = %self.staging.path().display(),
                    "kept staging directory for inspection"
                );
            }
        }
        Ok(())
    }
}
