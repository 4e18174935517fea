//! Content comparison for duplicate detection

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use log::trace;

use crate::core::config::{ComparisonConfig, ComparisonMode};
use crate::core::error::{MediaError, Result};
use crate::report::{ProgressReporter, TaskGuard};

/// Chunk size for full comparisons
const CHUNK_SIZE: usize = 64 * 1024;

/// Decides whether two files hold the same content
pub struct FileComparator {
    mode: ComparisonMode,
    prefix_bytes: usize,
    progress: Arc<dyn ProgressReporter>,
}

impl FileComparator {
    pub fn new(config: &ComparisonConfig, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            mode: config.mode,
            prefix_bytes: config.prefix_bytes.max(1),
            progress,
        }
    }

    /// Compare `source` with the existing `target`.
    ///
    /// Files of different length are never the same. In prefix mode files of
    /// equal length whose first `prefix_bytes` match are considered identical
    /// even if they differ later on.
    pub fn same_content(&self, source: &Path, target: &Path) -> Result<bool> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let _task = TaskGuard::start(self.progress.as_ref(), &format!("Comparing target {}", name));

        let mut source_file = File::open(source).map_err(|e| MediaError::io(source, e))?;
        let mut target_file = File::open(target).map_err(|e| MediaError::io(target, e))?;

        let source_size = source_file.metadata().map_err(|e| MediaError::io(source, e))?.len();
        let target_size = target_file.metadata().map_err(|e| MediaError::io(target, e))?.len();

        let same = source_size == target_size
            && match self.mode {
                ComparisonMode::Prefix => {
                    let mut source_buf = vec![0u8; self.prefix_bytes];
                    let mut target_buf = vec![0u8; self.prefix_bytes];
                    let source_len = read_full(&mut source_file, &mut source_buf)
                        .map_err(|e| MediaError::io(source, e))?;
                    let target_len = read_full(&mut target_file, &mut target_buf)
                        .map_err(|e| MediaError::io(target, e))?;

                    source_len == target_len && source_buf[..source_len] == target_buf[..target_len]
                }
                ComparisonMode::Full => streams_equal(&mut source_file, &mut target_file)
                    .map_err(|e| MediaError::io(target, e))?,
            };

        trace!(
            "Compared '{}' with '{}': {}",
            source.display(),
            target.display(),
            if same { "same" } else { "different" }
        );
        Ok(same)
    }
}

/// Read until `buf` is full or the reader is exhausted
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn streams_equal(a: &mut impl Read, b: &mut impl Read) -> std::io::Result<bool> {
    let mut a_buf = vec![0u8; CHUNK_SIZE];
    let mut b_buf = vec![0u8; CHUNK_SIZE];

    loop {
        let a_len = read_full(a, &mut a_buf)?;
        let b_len = read_full(b, &mut b_buf)?;

        if a_len != b_len || a_buf[..a_len] != b_buf[..b_len] {
            return Ok(false);
        }
        if a_len == 0 {
            return Ok(true);
        }
    }
}
