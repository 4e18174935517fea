//! Volume abstraction traits for testability
//!
//! The poller only sees these traits, so the whole pipeline can run against
//! a temporary directory pretending to be a memory card.

use crate::core::error::Result;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A mounted volume seen during one poll cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    /// Volume label, compared case-insensitively
    pub label: String,
    /// Mount point or drive root
    pub root: PathBuf,
    /// Disk name from the OS (`/dev/sdb1`; the volume name on Windows); may be empty
    pub device: String,
    /// File system name reported by the OS
    pub file_system: String,
    /// Whether the OS reports the disk as removable
    pub is_removable: bool,
    /// Total capacity in bytes
    pub total_bytes: u64,
    /// Free space in bytes
    pub available_bytes: u64,
}

impl Volume {
    /// Create a volume with just a label and root; other fields are empty
    pub fn new(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            root: root.into(),
            device: String::new(),
            file_system: String::new(),
            is_removable: true,
            total_bytes: 0,
            available_bytes: 0,
        }
    }

    /// Case-insensitive label comparison
    pub fn matches_label(&self, label: &str) -> bool {
        !self.label.is_empty() && self.label.to_lowercase() == label.trim().to_lowercase()
    }

    /// Root path as used for `{ROOT}` substitution: trailing separators removed
    pub fn root_for_template(&self) -> String {
        let root = self.root.to_string_lossy();
        root.trim_end_matches(['/', '\\']).to_string()
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.root.display())
    }
}

/// Lists mounted volumes
pub trait VolumeSource {
    /// Snapshot of the volumes mounted right now
    fn volumes(&self) -> Result<Vec<Volume>>;

    /// First volume whose label matches `label`
    fn find_by_label(&self, label: &str) -> Result<Option<Volume>> {
        Ok(self.volumes()?.into_iter().find(|v| v.matches_label(label)))
    }
}

/// Safely removes a volume
pub trait VolumeEjector: Send + Sync {
    /// Eject `volume`, returning whether it succeeded. Never panics.
    fn eject(&self, volume: &Volume) -> bool;
}
