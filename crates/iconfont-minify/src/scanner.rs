//! Scanning source files for icon class references.

use std::{
    collections::{BTreeSet, HashSet},
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use glob::{MatchOptions, Pattern};
use regex::bytes::Regex;

use crate::{
    errors::{Error, Result},
    MinifyOptions,
};

/// Icons referenced by the scanned sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedIcons {
    icons: BTreeSet<String>,
    files_read: usize,
}

impl UsedIcons {
    /// Iterates over icon names in the lexicographic order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.icons.iter().map(String::as_str)
    }

    /// Checks whether the specified icon is used.
    pub fn contains(&self, icon: &str) -> bool {
        self.icons.contains(icon)
    }

    /// Returns the number of used icons.
    pub fn len(&self) -> usize {
        self.icons.len()
    }

    /// Checks whether no icons are used.
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// Returns the number of files read during the scan.
    pub fn files_read(&self) -> usize {
        self.files_read
    }
}

/// Scanner finding `{prefix}-{icon}` class references in source files.
#[derive(Debug)]
pub struct ClassScanner {
    pattern: Regex,
    glob: String,
    src_dir: PathBuf,
    include: Vec<String>,
    exclude: HashSet<String>,
}

impl ClassScanner {
    /// Creates a scanner based on the provided options.
    ///
    /// # Errors
    ///
    /// Returns an error if the glob pattern is invalid.
    pub fn new(options: &MinifyOptions) -> Result<Self> {
        let src_dir = options.src_dir.to_string_lossy();
        let glob = format!(
            "{}/{}",
            Pattern::escape(src_dir.trim_end_matches(['/', '\\'])),
            options.glob_pattern
        );
        Pattern::new(&glob).map_err(|source| Error::Glob {
            pattern: glob.clone(),
            source,
        })?;

        let prefix = regex::escape(&options.prefix);
        let pattern = Regex::new(&format!("{prefix}-([A-Za-z0-9_-]+)")).map_err(|source| {
            Error::Pattern {
                pattern: options.prefix.clone(),
                source,
            }
        })?;

        Ok(Self {
            pattern,
            glob,
            src_dir: options.src_dir.clone(),
            include: options.include.clone(),
            exclude: options.exclude.iter().cloned().collect(),
        })
    }

    /// Scans matching files. Dot-files and files in dot-directories are skipped;
    /// files are not required to be valid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the source directory is inaccessible, or a matching file cannot be read.
    pub fn scan(&self) -> Result<UsedIcons> {
        let metadata = fs::metadata(&self.src_dir).map_err(|source| Error::SourceDir {
            path: self.src_dir.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(Error::SourceDir {
                path: self.src_dir.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        let match_options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::default()
        };
        let paths = glob::glob_with(&self.glob, match_options).map_err(|source| Error::Glob {
            pattern: self.glob.clone(),
            source,
        })?;

        let mut used = UsedIcons::default();
        for path in paths {
            let path = path.map_err(|err| Error::Read {
                path: err.path().to_owned(),
                source: err.into_error(),
            })?;
            if !path.is_file() {
                continue;
            }
            self.scan_file(&path, &mut used.icons)?;
            used.files_read += 1;
        }
        used.icons.extend(self.include.iter().cloned());

        tracing::debug!(
            files_read = used.files_read,
            icons = ?used.icons,
            "scanned sources for icon classes"
        );
        Ok(used)
    }

    fn scan_file(&self, path: &Path, icons: &mut BTreeSet<String>) -> Result<()> {
        let contents = fs::read(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        for captures in self.pattern.captures_iter(&contents) {
            // The capture group only matches ASCII chars.
            let icon = String::from_utf8_lossy(&captures[1]);
            if !self.exclude.contains(&*icon) {
                icons.insert(icon.into_owned());
            }
        }
        Ok(())
    }
}

/// Build-scoped cache of [`UsedIcons`]. The sources are scanned at most once;
/// a failed scan is not cached.
#[derive(Debug)]
pub struct UsageCache {
    scanner: ClassScanner,
    used: Option<Arc<UsedIcons>>,
    scan_count: usize,
}

impl UsageCache {
    /// Creates a cache wrapping the provided scanner. No scanning is performed.
    pub fn new(scanner: ClassScanner) -> Self {
        Self {
            scanner,
            used: None,
            scan_count: 0,
        }
    }

    /// Returns the cached scan results, scanning the sources if necessary.
    ///
    /// # Errors
    ///
    /// Propagates scanning errors.
    pub fn get_or_scan(&mut self) -> Result<Arc<UsedIcons>> {
        if let Some(used) = &self.used {
            return Ok(Arc::clone(used));
        }
        self.scan_count += 1;
        let used = Arc::new(self.scanner.scan()?);
        self.used = Some(Arc::clone(&used));
        Ok(used)
    }

    /// Returns the number of times the sources were scanned.
    pub fn scan_count(&self) -> usize {
        self.scan_count
    }
}
