//! Minification options.

use std::path::PathBuf;

use serde::Deserialize;

/// Options of the [`Minifier`](crate::Minifier).
///
/// All fields have defaults, so the options can be deserialized from a partial object
/// with camel-cased keys, e.g. `{ "srcDir": "app", "globPattern": "**/*.html" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinifyOptions {
    /// Icon class prefix. Icons are referenced in the sources as `{prefix}-{icon}`.
    pub prefix: String,
    /// Icons (without the prefix) always retained, regardless of `exclude`.
    pub include: Vec<String>,
    /// Class names (without the prefix) that are not icons, e.g. size or animation modifiers.
    pub exclude: Vec<String>,
    /// Glob pattern for source files, relative to `src_dir`.
    pub glob_pattern: String,
    /// Directory with source files.
    pub src_dir: PathBuf,
    /// Retains the staging directory after the build and enables diagnostic output.
    pub debug: bool,
    /// Regular expression matching paths of the main stylesheet with codepoint rules.
    pub main_stylesheet_pattern: String,
    /// Regular expression matching paths of style variant stylesheets (one per font).
    pub variant_stylesheet_pattern: String,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        const EXCLUDE: &[&str] = &[
            "fw",
            "2x",
            "3x",
            "4x",
            "5x",
            "lg",
            "spin",
            "pull-left",
            "pull-right",
            "rotate",
            "rotate-90",
            "rotate-180",
            "rotate-270",
            "regular",
            "solid",
            "brands",
        ];

        Self {
            prefix: "fa".to_owned(),
            include: vec![],
            exclude: EXCLUDE.iter().map(|&class| class.to_owned()).collect(),
            glob_pattern: "**/*".to_owned(),
            src_dir: PathBuf::from("./"),
            debug: false,
            main_stylesheet_pattern: r"fontawesome\.css".to_owned(),
            variant_stylesheet_pattern: r"(solid|regular|brands|light)\.css".to_owned(),
        }
    }
}
