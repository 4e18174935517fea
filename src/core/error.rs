//! Error types for the media downloader
//!
//! This module defines the error type shared by the transfer engine and the
//! volume layer. Configuration file errors live in [`crate::core::config`].

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for the media downloader
#[derive(Error, Debug)]
pub enum MediaError {
    /// I/O failure on a specific path
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// General I/O error without path context
    #[error("IO error: {0}")]
    IoError(String),

    /// Source directory of an operation does not exist
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// A filename mask could not be compiled
    #[error("Invalid file mask '{pattern}': {message}")]
    InvalidMask { pattern: String, message: String },

    /// Mounted volumes could not be listed
    #[error("Volume enumeration failed: {0}")]
    VolumeEnumeration(String),

    /// Operation settings are incomplete or invalid
    #[error("{0}")]
    Configuration(String),
}

impl MediaError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        MediaError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MediaError>;

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = MediaError::io(
            "/media/card/DCIM/a.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let message = err.to_string();
        assert!(message.contains("a.jpg"));
        assert!(message.contains("gone"));
    }

    #[test]
    fn test_from_io_error() {
        let err: MediaError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, MediaError::IoError(ref m) if m == "boom"));
    }
}
