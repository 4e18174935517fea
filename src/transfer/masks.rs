//! Filename masks

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::core::error::{MediaError, Result};

/// Union of case-insensitive glob masks matched against file names.
///
/// An empty mask list, `*` or the DOS-style `*.*` match every file.
#[derive(Debug, Clone)]
pub struct FileMask {
    set: Option<GlobSet>,
}

impl FileMask {
    /// Compile `masks`
    pub fn new<S: AsRef<str>>(masks: &[S]) -> Result<Self> {
        let patterns: Vec<&str> = masks
            .iter()
            .map(|m| m.as_ref().trim())
            .filter(|m| !m.is_empty())
            .collect();

        if patterns.is_empty() || patterns.iter().any(|p| *p == "*" || *p == "*.*") {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| MediaError::InvalidMask {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| MediaError::InvalidMask {
            pattern: "<set>".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { set: Some(set) })
    }

    /// Does the file name of `path` match any mask?
    pub fn matches(&self, path: &Path) -> bool {
        match (&self.set, path.file_name()) {
            (None, _) => true,
            (Some(set), Some(name)) => set.is_match(Path::new(name)),
            (Some(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matches_everything() {
        let mask = FileMask::new::<&str>(&[]).unwrap();
        assert!(mask.matches(Path::new("/a/b/anything")));
    }

    #[test]
    fn test_star_dot_star_matches_files_without_extension() {
        let mask = FileMask::new(&["*.*"]).unwrap();
        assert!(mask.matches(Path::new("/card/README")));
        assert!(mask.matches(Path::new("/card/a.jpg")));
    }

    #[test]
    fn test_case_insensitive() {
        let mask = FileMask::new(&["*.jpg"]).unwrap();
        assert!(mask.matches(Path::new("/card/DCIM/IMG_0001.JPG")));
        assert!(!mask.matches(Path::new("/card/DCIM/MVI_0001.MOV")));
    }

    #[test]
    fn test_union() {
        let mask = FileMask::new(&["*.jpg", "*.cr2"]).unwrap();
        assert!(mask.matches(Path::new("a.CR2")));
        assert!(mask.matches(Path::new("a.jpg")));
        assert!(!mask.matches(Path::new("a.txt")));
    }

    #[test]
    fn test_matches_name_not_directory() {
        let mask = FileMask::new(&["IMG*"]).unwrap();
        assert!(mask.matches(Path::new("/IMG_DIR/IMG_1.jpg")));
        assert!(!mask.matches(Path::new("/IMG_DIR/DSC_1.jpg")));
    }

    #[test]
    fn test_invalid_mask() {
        let err = FileMask::new(&["[unclosed"]).unwrap_err();
        assert!(matches!(err, MediaError::InvalidMask { .. }));
    }
}
