//! Chunked file copy with progress, cancellation and metadata preservation

use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use filetime::FileTime;
use log::{debug, info, warn};

use crate::core::error::{MediaError, Result};
use crate::core::shutdown::is_shutdown;
use crate::report::{ProgressReporter, TaskGuard};

/// Copy buffer size
const CHUNK_SIZE: usize = 64 * 1024;

/// Result of a copy that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// All data and metadata written
    Completed { bytes: u64 },
    /// Shutdown requested; the partial target is left in place
    Cancelled { bytes: u64 },
}

impl CopyOutcome {
    pub fn bytes(&self) -> u64 {
        match self {
            CopyOutcome::Completed { bytes } | CopyOutcome::Cancelled { bytes } => *bytes,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CopyOutcome::Cancelled { .. })
    }
}

/// Streams files in 64 KiB chunks
pub struct FileCopier {
    progress: Arc<dyn ProgressReporter>,
    shutdown_flag: Arc<AtomicBool>,
}

impl FileCopier {
    pub fn new(progress: Arc<dyn ProgressReporter>, shutdown_flag: Arc<AtomicBool>) -> Self {
        Self {
            progress,
            shutdown_flag,
        }
    }

    /// Copy `source` to `target`, which must not exist yet.
    ///
    /// On error the partially written target is removed. The source is
    /// never touched.
    pub fn copy(&self, source: &Path, target: &Path) -> Result<CopyOutcome> {
        if is_shutdown(&self.shutdown_flag) {
            return Ok(CopyOutcome::Cancelled { bytes: 0 });
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut task = TaskGuard::start(self.progress.as_ref(), &format!("Copy {}", name));

        info!("Copying '{}' to '{}'", source.display(), target.display());

        let mut reader = File::open(source).map_err(|e| MediaError::io(source, e))?;
        let metadata = reader.metadata().map_err(|e| MediaError::io(source, e))?;

        let result = self
            .stream(source, &mut reader, &metadata, target, &mut task)
            .and_then(|outcome| {
                if let CopyOutcome::Completed { .. } = outcome {
                    copy_metadata(&metadata, target).map_err(|e| MediaError::io(target, e))?;
                }
                Ok(outcome)
            });

        if let Err(e) = &result {
            warn!("Copy of '{}' failed: {}", source.display(), e);
            if target.exists() {
                info!("Deleting '{}' due to error", target.display());
                if let Err(remove_error) = fs::remove_file(target) {
                    warn!("Could not delete '{}': {}", target.display(), remove_error);
                }
            }
        }

        result
    }

    fn stream(
        &self,
        source: &Path,
        reader: &mut File,
        metadata: &Metadata,
        target: &Path,
        task: &mut TaskGuard,
    ) -> Result<CopyOutcome> {
        let total = metadata.len();
        let mut writer = File::create(target).map_err(|e| MediaError::io(target, e))?;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut copied = 0u64;

        task.report(total, 0);

        loop {
            if is_shutdown(&self.shutdown_flag) {
                debug!("Copy to '{}' cancelled after {} bytes", target.display(), copied);
                return Ok(CopyOutcome::Cancelled { bytes: copied });
            }

            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MediaError::io(source, e)),
            };

            writer
                .write_all(&buffer[..read])
                .map_err(|e| MediaError::io(target, e))?;

            copied += read as u64;
            task.report(total, copied);
        }

        writer.flush().map_err(|e| MediaError::io(target, e))?;
        Ok(CopyOutcome::Completed { bytes: copied })
    }
}

/// Copy timestamps and the read-only attribute from `source` to `target`.
///
/// Permissions go last so a read-only source does not block the time update.
fn copy_metadata(source: &Metadata, target: &Path) -> io::Result<()> {
    #[cfg(windows)]
    if let Ok(created) = source.created() {
        use std::fs::{FileTimes, OpenOptions};
        use std::os::windows::fs::FileTimesExt;

        let file = OpenOptions::new().write(true).open(target)?;
        file.set_times(FileTimes::new().set_created(created))?;
    }

    filetime::set_file_times(
        target,
        FileTime::from_last_access_time(source),
        FileTime::from_last_modification_time(source),
    )?;

    fs::set_permissions(target, source.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::{write_file, RecordingProgress};
    use std::sync::atomic::Ordering;

    fn copier() -> (FileCopier, Arc<RecordingProgress>, Arc<AtomicBool>) {
        let progress = Arc::new(RecordingProgress::new());
        let flag = Arc::new(AtomicBool::new(false));
        (FileCopier::new(progress.clone(), flag.clone()), progress, flag)
    }

    #[test]
    fn test_copy_contents_and_progress() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..150_000u32).map(|i| (i % 253) as u8).collect();
        let source = write_file(dir.path(), "a.mp4", &data);
        let target = dir.path().join("out.mp4");

        let (copier, progress, _) = copier();
        let outcome = copier.copy(&source, &target).unwrap();

        assert_eq!(outcome, CopyOutcome::Completed { bytes: 150_000 });
        assert_eq!(fs::read(&target).unwrap(), data);

        let tasks = progress.tasks();
        assert_eq!(tasks[0].title, "Copy a.mp4");
        assert_eq!(tasks[0].reports.first(), Some(&(150_000, 0)));
        assert_eq!(tasks[0].reports.last(), Some(&(150_000, 150_000)));
        assert_eq!(tasks[0].reports.len(), 4);
        assert_eq!(tasks[0].completions, 1);
    }

    #[test]
    fn test_copy_preserves_modified_time() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_file(dir.path(), "a.jpg", b"pixels");
        let old = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&source, old).unwrap();

        let target = dir.path().join("b.jpg");
        let (copier, _, _) = copier();
        copier.copy(&source, &target).unwrap();

        let meta = fs::metadata(&target).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), old);
    }

    #[test]
    fn test_copy_preserves_readonly() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_file(dir.path(), "a.jpg", b"pixels");
        let mut perms = fs::metadata(&source).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&source, perms).unwrap();

        let target = dir.path().join("b.jpg");
        let (copier, _, _) = copier();
        copier.copy(&source, &target).unwrap();

        assert!(fs::metadata(&target).unwrap().permissions().readonly());

        for path in [&source, &target] {
            let mut perms = fs::metadata(path).unwrap().permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(path, perms).unwrap();
        }
    }

    #[test]
    fn test_cancelled_before_start_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_file(dir.path(), "a.jpg", b"pixels");
        let target = dir.path().join("b.jpg");

        let (copier, progress, flag) = copier();
        flag.store(true, Ordering::SeqCst);

        assert_eq!(
            copier.copy(&source, &target).unwrap(),
            CopyOutcome::Cancelled { bytes: 0 }
        );
        assert!(!target.exists());
        assert!(progress.tasks().is_empty());
    }

    #[test]
    fn test_cancel_mid_copy_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = vec![7u8; 5 * CHUNK_SIZE];
        let source = write_file(dir.path(), "big.mov", &data);
        let target = dir.path().join("big-copy.mov");

        let flag = Arc::new(AtomicBool::new(false));
        let progress = Arc::new(RecordingProgress::new().cancel_after_reports(flag.clone(), 3));
        let copier = FileCopier::new(progress.clone(), flag.clone());

        let outcome = copier.copy(&source, &target).unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.bytes(), 2 * CHUNK_SIZE as u64);
        assert!(target.exists());
        assert_eq!(fs::metadata(&target).unwrap().len(), 2 * CHUNK_SIZE as u64);
        assert!(source.exists());
        assert_eq!(progress.tasks()[0].completions, 1);
    }

    #[test]
    fn test_error_removes_partial_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_file(dir.path(), "a.jpg", b"pixels");
        let target = dir.path().join("missing-dir").join("a.jpg");

        let (copier, progress, _) = copier();
        assert!(copier.copy(&source, &target).is_err());
        assert!(!target.exists());
        assert!(source.exists());
        assert_eq!(progress.tasks()[0].completions, 1);
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let (copier, _, _) = copier();
        let result = copier.copy(&dir.path().join("nope.jpg"), &dir.path().join("out.jpg"));
        assert!(result.is_err());
        assert!(!dir.path().join("out.jpg").exists());
    }

    #[test]
    fn test_unreadable_source_error_names_source() {
        let dir = tempfile::tempdir().unwrap();
        // A directory opens as a file on some platforms but never reads
        let source = dir.path().join("DCIM");
        fs::create_dir(&source).unwrap();
        let target = dir.path().join("out.jpg");

        let (copier, _, _) = copier();
        let err = copier.copy(&source, &target).unwrap_err();

        match err {
            MediaError::Io { path, .. } => assert_eq!(path, source),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!target.exists());
    }
}
