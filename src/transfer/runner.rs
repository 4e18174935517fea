//! Per-operation file enumeration and processing
//!
//! Drives the template expander, resolver, comparator and copier for each
//! file matched by a Copy or Move operation, and plain deletion for Delete.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use walkdir::WalkDir;

use super::compare::FileComparator;
use super::copier::{CopyOutcome, FileCopier};
use super::masks::FileMask;
use super::resolver::{Resolution, UniqueTargetResolver};
use super::template;
use crate::core::config::Config;
use crate::core::error::{MediaError, Result};
use crate::core::shutdown::is_shutdown;
use crate::report::{ProgressReporter, TaskGuard};

/// Counters for one operation (or an aggregate of several)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Files matched by the masks
    pub files_found: usize,
    /// Files copied to a new target
    pub copied: usize,
    /// Files skipped because an identical target exists
    pub duplicates: usize,
    /// Source files deleted (Move and Delete)
    pub deleted: usize,
    /// Files that failed at any step
    pub failed: usize,
    /// Bytes written to targets
    pub bytes_copied: u64,
    /// Processing stopped because of shutdown
    pub cancelled: bool,
}

impl TransferStats {
    /// Add `other` into `self`
    pub fn merge(&mut self, other: &TransferStats) {
        self.files_found += other.files_found;
        self.copied += other.copied;
        self.duplicates += other.duplicates;
        self.deleted += other.deleted;
        self.failed += other.failed;
        self.bytes_copied += other.bytes_copied;
        self.cancelled |= other.cancelled;
    }
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} found, {} copied ({:.2} MB), {} duplicates skipped, {} deleted, {} failed",
            self.files_found,
            self.copied,
            self.bytes_copied as f64 / (1024.0 * 1024.0),
            self.duplicates,
            self.deleted,
            self.failed
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// List files under `source` whose names match `masks`, sorted by path.
///
/// `recursive = false` lists the top level only.
pub fn find_files<S: AsRef<str>>(source: &Path, masks: &[S], recursive: bool) -> Result<Vec<PathBuf>> {
    if !source.is_dir() {
        return Err(MediaError::SourceNotFound(source.to_path_buf()));
    }

    let mask = FileMask::new(masks)?;
    let mut walker = WalkDir::new(source).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && mask.matches(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under '{}': {}", source.display(), e),
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// How a single file's processing ended
enum FileStep {
    Done,
    Cancelled,
}

/// Runs Copy, Move and Delete operations against one source directory
pub struct FileOperationRunner {
    comparator: FileComparator,
    copier: FileCopier,
    progress: Arc<dyn ProgressReporter>,
    shutdown_flag: Arc<AtomicBool>,
    settle_delay: Duration,
}

impl FileOperationRunner {
    pub fn new(
        config: &Config,
        progress: Arc<dyn ProgressReporter>,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            comparator: FileComparator::new(&config.comparison, Arc::clone(&progress)),
            copier: FileCopier::new(Arc::clone(&progress), Arc::clone(&shutdown_flag)),
            progress,
            shutdown_flag,
            settle_delay: config.poller.settle_delay(),
        }
    }

    fn start_task(&self, title: String) -> TaskGuard {
        TaskGuard::start(self.progress.as_ref(), &title)
            .with_settle_delay(self.settle_delay, Arc::clone(&self.shutdown_flag))
    }

    /// Copy (or move, with `delete_source`) matching files to `target_template`.
    ///
    /// A failure on one file is logged and counted; the remaining files are
    /// still processed. A failed file's source is never deleted.
    pub fn transfer_files<S: AsRef<str>>(
        &self,
        source: &Path,
        target_template: &str,
        masks: &[S],
        recursive: bool,
        delete_source: bool,
    ) -> Result<TransferStats> {
        let mut task = self.start_task(format!("Download from {}", source.display()));
        let files = find_files(source, masks, recursive)?;

        let mut stats = TransferStats {
            files_found: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            debug!("No matching files in '{}'", source.display());
            return Ok(stats);
        }

        info!(
            "{} {} files from '{}'",
            if delete_source { "Moving" } else { "Copying" },
            files.len(),
            source.display()
        );

        let total = files.len() as u64;
        task.report(total, 0);

        for (index, file) in files.iter().enumerate() {
            if is_shutdown(&self.shutdown_flag) {
                stats.cancelled = true;
                break;
            }

            match self.transfer_one(file, target_template, delete_source, &mut stats) {
                Ok(FileStep::Done) => {}
                Ok(FileStep::Cancelled) => {
                    stats.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!("Failed to transfer '{}': {}", file.display(), e);
                    stats.failed += 1;
                }
            }

            task.report(total, index as u64 + 1);
        }

        info!("Download from '{}': {}", source.display(), stats);
        Ok(stats)
    }

    fn transfer_one(
        &self,
        file: &Path,
        target_template: &str,
        delete_source: bool,
        stats: &mut TransferStats,
    ) -> Result<FileStep> {
        let desired = template::expand(target_template, file)?;

        match UniqueTargetResolver::new(&self.comparator).resolve(file, &desired)? {
            Resolution::InPlace => {
                debug!("'{}' is already at its target", file.display());
                stats.duplicates += 1;
                return Ok(FileStep::Done);
            }
            Resolution::Skip => {
                debug!("Skipping '{}', identical file exists", file.display());
                stats.duplicates += 1;
            }
            Resolution::Target(target) => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| MediaError::io(parent, e))?;
                }

                match self.copier.copy(file, &target)? {
                    CopyOutcome::Completed { bytes } => {
                        stats.copied += 1;
                        stats.bytes_copied += bytes;
                    }
                    CopyOutcome::Cancelled { bytes } => {
                        stats.bytes_copied += bytes;
                        return Ok(FileStep::Cancelled);
                    }
                }
            }
        }

        if delete_source {
            fs::remove_file(file).map_err(|e| MediaError::io(file, e))?;
            stats.deleted += 1;
        }

        Ok(FileStep::Done)
    }

    /// Delete matching files under `source`
    pub fn delete_files<S: AsRef<str>>(
        &self,
        source: &Path,
        masks: &[S],
        recursive: bool,
    ) -> Result<TransferStats> {
        let mut task = self.start_task(format!("Deleting files from {}", source.display()));
        let files = find_files(source, masks, recursive)?;

        let mut stats = TransferStats {
            files_found: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            return Ok(stats);
        }

        let total = files.len() as u64;
        task.report(total, 0);

        for (index, file) in files.iter().enumerate() {
            if is_shutdown(&self.shutdown_flag) {
                stats.cancelled = true;
                break;
            }

            match fs::remove_file(file) {
                Ok(()) => stats.deleted += 1,
                Err(e) => {
                    error!("Failed to delete '{}': {}", file.display(), e);
                    stats.failed += 1;
                }
            }

            task.report(total, index as u64 + 1);
        }

        info!("Deleted {} of {} files from '{}'", stats.deleted, total, source.display());
        Ok(stats)
    }
}
