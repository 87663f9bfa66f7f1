//! Build-time reduction of icon-font assets to the icons an application uses.
//!
//! Given sources of an application and an icon font library (e.g., Font Awesome),
//! the [`Minifier`] finds icon classes referenced in the sources and produces
//! reduced versions of the library assets in a staging directory:
//!
//! - The main stylesheet (e.g., `fontawesome.css`) is reduced to shared rules and
//!   codepoint rules for the used icons.
//! - For each style variant stylesheet (e.g., `solid.css`), the referenced SVG font is reduced
//!   to the used glyphs, and TrueType, WOFF, WOFF2 and EOT fonts are regenerated from it.
//!
//! The minifier is driven by a host build tool via the [`ResourceInterceptor`] hooks.
//!
//! # Examples
//!
//! ```no_run
//! use iconfont_minify::{Minifier, MinifyOptions, Resource, ResourceInterceptor};
//!
//! let options = MinifyOptions {
//!     src_dir: "app".into(),
//!     glob_pattern: "**/*.html".to_owned(),
//!     ..MinifyOptions::default()
//! };
//! let mut minifier = Minifier::new(options)?;
//!
//! let mut resource = Resource::new("node_modules/@fortawesome/css/fontawesome.css");
//! if let Some(redirect) = minifier.on_resolve(&resource)? {
//!     redirect.apply(&mut resource);
//! }
//! // `resource` now points to the minified stylesheet in the staging directory.
//! minifier.on_complete()?;
//! # Ok::<_, iconfont_minify::Error>(())
//! ```

#![doc(html_root_url = "https://docs.rs/iconfont-minify/0.1.0")]

mod driver;
mod errors;
mod options;
mod scanner;
mod staging;
mod stylesheet;
mod svg_font;
#[cfg(test)]
mod tests;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

pub use crate::{
    driver::{BuiltinTranscoder, FontTranscoder, Minifier, Redirect, Resource, ResourceInterceptor},
    errors::{Error, Result, SubsetError},
    options::MinifyOptions,
    scanner::{ClassScanner, UsageCache, UsedIcons},
    staging::StagingArea,
    stylesheet::{
        extract_file_path, FontFormat, FontReferences, MainStylesheet, MinimizedStylesheet,
    },
    svg_font::{SvgFontDocument, SvgFontSubset},
};
