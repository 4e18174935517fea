//! File categories by extension
//!
//! Used by the `categorize` command to sort downloaded files into movies,
//! images, archives and junk.

use serde::Serialize;
use std::fmt;

/// Broad kind of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Movie,
    Image,
    Archive,
    /// Sidecar files, shortcuts, executables and other download debris
    Unwanted,
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Movie => "Movie",
            Category::Image => "Image",
            Category::Archive => "Archive",
            Category::Unwanted => "Unwanted",
            Category::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

const CATEGORIES: &[(&str, Category)] = &[
    (".mp4", Category::Movie),
    (".mkv", Category::Movie),
    (".wmv", Category::Movie),
    (".mov", Category::Movie),
    (".flv", Category::Movie),
    (".avi", Category::Movie),
    (".jpg", Category::Image),
    (".jpeg", Category::Image),
    (".png", Category::Image),
    (".zip", Category::Archive),
    (".7z", Category::Archive),
    (".url", Category::Unwanted),
    (".nfo", Category::Unwanted),
    (".txt", Category::Unwanted),
    (".srr", Category::Unwanted),
    (".htm", Category::Unwanted),
    (".html", Category::Unwanted),
    (".lnk", Category::Unwanted),
    (".exe", Category::Unwanted),
    (".bat", Category::Unwanted),
    (".com", Category::Unwanted),
    (".error", Category::Unwanted),
    (".gif", Category::Unwanted),
];

/// Split-archive parts posted to newsgroups
const YENC_PREFIX: &str = ".zip_ yenc";

/// Extension of the last path segment including the dot, or `""`
fn extension(file_name: &str) -> &str {
    let name = file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file_name);
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[dot..],
        _ => "",
    }
}

/// Categorize a file name by its extension, ignoring case
pub fn categorize(file_name: &str) -> Category {
    if file_name.trim().is_empty() {
        return Category::Unknown;
    }

    let extension = extension(file_name).to_lowercase();
    if extension.is_empty() {
        return Category::Unknown;
    }

    if let Some((_, category)) = CATEGORIES.iter().find(|(ext, _)| *ext == extension) {
        return *category;
    }

    if extension.starts_with(YENC_PREFIX) {
        return Category::Unwanted;
    }

    Category::Unknown
}
