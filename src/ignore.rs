//! Entry classification for source directories.
//! Decides whether a directory entry is rendered as a template, copied
//! verbatim, or skipped entirely.

use crate::constants::{CONFIG_FILE, DEFAULT_IGNORE_PATTERNS, SAMPLE_FILE};
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// How a directory entry is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    /// Template file, rendered into the output
    Process,
    /// Configuration or otherwise excluded file, never staged
    Ignore,
    /// Any other file, copied byte-for-byte
    Copy,
}

/// Compiled process and ignore patterns for one template suffix.
#[derive(Debug, Clone)]
pub struct EntryPatterns {
    process: GlobSet,
    ignore: GlobSet,
}

fn build_set<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| {
            Error::PatternError(format!("invalid pattern '{}': {}", pattern, e))
        })?);
    }
    builder
        .build()
        .map_err(|e| Error::PatternError(format!("pattern set loading failed: {}", e)))
}

impl EntryPatterns {
    /// Builds patterns for templates ending in `.<suffix>`.
    ///
    /// # Errors
    /// * `Error::PatternError` if the suffix produces an invalid glob
    pub fn new(suffix: &str) -> Result<Self> {
        let process_pattern = format!("*.{}", suffix);
        // a file named just `.<suffix>` has no destination name
        let bare_suffix = format!(".{}", suffix);
        let process = build_set([process_pattern.as_str()])?;
        let ignore = build_set(
            [CONFIG_FILE, SAMPLE_FILE, bare_suffix.as_str()]
                .into_iter()
                .chain(DEFAULT_IGNORE_PATTERNS),
        )?;
        Ok(Self { process, ignore })
    }

    /// Classifies an entry by file name.
    pub fn classify(&self, name: &str) -> EntryClass {
        if self.ignore.is_match(name) {
            EntryClass::Ignore
        } else if self.process.is_match(name) {
            EntryClass::Process
        } else {
            EntryClass::Copy
        }
    }
}
