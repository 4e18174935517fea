//! Collision-safe target naming

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::compare::FileComparator;
use crate::core::error::Result;

/// Where a source file should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Write to this path; nothing exists there yet
    Target(PathBuf),
    /// An identical file already exists at the desired path
    Skip,
    /// The desired path is the source file itself
    InPlace,
}

/// Finds a free target path without overwriting different content
pub struct UniqueTargetResolver<'a> {
    comparator: &'a FileComparator,
}

impl<'a> UniqueTargetResolver<'a> {
    pub fn new(comparator: &'a FileComparator) -> Self {
        Self { comparator }
    }

    /// Resolve `desired` for `source`.
    ///
    /// A free path is returned unchanged. A desired path that is the source
    /// itself yields [`Resolution::InPlace`], and an existing file with the
    /// same content yields [`Resolution::Skip`]. Otherwise the first free
    /// `name (n).ext` for n = 2, 3, ... is returned.
    pub fn resolve(&self, source: &Path, desired: &Path) -> Result<Resolution> {
        if !desired.exists() {
            return Ok(Resolution::Target(desired.to_path_buf()));
        }

        if is_same_file(source, desired) {
            debug!("'{}' is already in place", source.display());
            return Ok(Resolution::InPlace);
        }

        if desired.is_file() && self.comparator.same_content(source, desired)? {
            debug!("'{}' already exists with the same content", desired.display());
            return Ok(Resolution::Skip);
        }

        Ok(Resolution::Target(numbered_candidate(desired)))
    }
}

/// Both paths name the same file on disk
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// First `stem (n)ext` next to `desired` that does not exist, starting at 2
fn numbered_candidate(desired: &Path) -> PathBuf {
    let parent = desired.parent().unwrap_or_else(|| Path::new(""));
    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = desired
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (2u32..)
        .map(|n| parent.join(format!("{} ({}){}", stem, n, extension)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| desired.to_path_buf())
}
