//! Host volume enumeration via `sysinfo`

use std::collections::HashMap;
use std::path::Path;

use log::trace;
use sysinfo::{Disk, Disks};

use super::traits::{Volume, VolumeSource};
use crate::core::error::Result;

/// Volumes reported by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemVolumes;

impl SystemVolumes {
    pub fn new() -> Self {
        Self
    }
}

impl VolumeSource for SystemVolumes {
    fn volumes(&self) -> Result<Vec<Volume>> {
        let disks = Disks::new_with_refreshed_list();
        let labels = device_labels();

        let volumes: Vec<Volume> = disks
            .list()
            .iter()
            .map(|disk| to_volume(disk, &labels))
            .collect();

        trace!("Enumerated {} volumes", volumes.len());
        Ok(volumes)
    }
}

fn to_volume(disk: &Disk, labels: &HashMap<String, String>) -> Volume {
    let device = disk.name().to_string_lossy().to_string();
    let root = disk.mount_point().to_path_buf();

    Volume {
        label: volume_label(&device, &root, labels),
        root,
        device,
        file_system: disk.file_system().to_string_lossy().to_string(),
        is_removable: disk.is_removable(),
        total_bytes: disk.total_space(),
        available_bytes: disk.available_space(),
    }
}

// ===== Label lookup =====

/// On Windows `sysinfo` already reports the volume name.
#[cfg(windows)]
fn volume_label(device: &str, _root: &Path, _labels: &HashMap<String, String>) -> String {
    device.to_string()
}

/// macOS mounts every volume at `/Volumes/<label>`.
#[cfg(target_os = "macos")]
fn volume_label(device: &str, root: &Path, _labels: &HashMap<String, String>) -> String {
    if root.starts_with("/Volumes") {
        if let Some(name) = root.file_name() {
            return name.to_string_lossy().to_string();
        }
    }
    device.to_string()
}

/// Linux: `/dev/disk/by-label`, then the mount directory name for the usual
/// automount roots.
#[cfg(not(any(windows, target_os = "macos")))]
fn volume_label(device: &str, root: &Path, labels: &HashMap<String, String>) -> String {
    if let Some(label) = labels.get(device) {
        return label.clone();
    }

    const AUTOMOUNT_ROOTS: [&str; 3] = ["/media", "/run/media", "/mnt"];
    if AUTOMOUNT_ROOTS.iter().any(|prefix| root.starts_with(prefix)) {
        if let Some(name) = root.file_name() {
            return name.to_string_lossy().to_string();
        }
    }
    String::new()
}

/// Map of device path to label read from `/dev/disk/by-label`
#[cfg(not(any(windows, target_os = "macos")))]
fn device_labels() -> HashMap<String, String> {
    let mut labels = HashMap::new();

    let Ok(entries) = std::fs::read_dir("/dev/disk/by-label") else {
        return labels;
    };

    for entry in entries.flatten() {
        let label = decode_label(&entry.file_name().to_string_lossy());
        if let Ok(target) = std::fs::canonicalize(entry.path()) {
            labels.insert(target.to_string_lossy().to_string(), label);
        }
    }
    labels
}

#[cfg(any(windows, target_os = "macos"))]
fn device_labels() -> HashMap<String, String> {
    HashMap::new()
}

/// udev escapes unsafe characters in label link names as `\xHH`.
#[cfg_attr(any(windows, target_os = "macos"), allow(dead_code))]
fn decode_label(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() && bytes[i + 1] == b'x' {
            let value = std::str::from_utf8(&bytes[i + 2..i + 4])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(value) = value {
                decoded.push(value);
                i += 4;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).to_string()
}
