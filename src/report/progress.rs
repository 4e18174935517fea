use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::core::shutdown::sleep_unless_shutdown;

/// A single unit of work shown to the user
pub trait TaskProgress: Send {
    /// Report `current` out of `total` (files or bytes, depending on the task)
    fn report(&mut self, total: u64, current: u64);

    /// Signal that the task is finished
    fn complete(&mut self);
}

/// Factory for progress tasks
pub trait ProgressReporter: Send + Sync {
    /// Start a new task with the given title
    fn create_task(&self, title: &str) -> Box<dyn TaskProgress>;
}

// =============================================================================
// Task guard
// =============================================================================

/// Completes the wrapped task exactly once, when dropped.
///
/// An optional settle delay keeps the finished task visible for a moment
/// before it is completed. The delay is cut short if shutdown is requested.
pub struct TaskGuard {
    task: Box<dyn TaskProgress>,
    settle: Option<(Duration, Arc<AtomicBool>)>,
}

impl TaskGuard {
    /// Create a task through `reporter` and guard it
    pub fn start(reporter: &dyn ProgressReporter, title: &str) -> Self {
        Self {
            task: reporter.create_task(title),
            settle: None,
        }
    }

    /// Wait `delay` before completing, unless `shutdown_flag` is set
    pub fn with_settle_delay(mut self, delay: Duration, shutdown_flag: Arc<AtomicBool>) -> Self {
        if !delay.is_zero() {
            self.settle = Some((delay, shutdown_flag));
        }
        self
    }

    /// Forward a progress report to the task
    pub fn report(&mut self, total: u64, current: u64) {
        self.task.report(total, current);
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some((delay, flag)) = &self.settle {
            sleep_unless_shutdown(*delay, flag);
        }
        self.task.complete();
    }
}

// =============================================================================
// Log-only reporter
// =============================================================================

/// Interval between progress log lines for a single task
const LOG_INTERVAL: Duration = Duration::from_secs(2);

/// Progress reporter that only writes log lines (used with `--quiet`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn create_task(&self, title: &str) -> Box<dyn TaskProgress> {
        debug!("{}", title);
        Box::new(LogTask {
            title: title.to_string(),
            started: Instant::now(),
            last_logged: None,
            completed: false,
        })
    }
}

struct LogTask {
    title: String,
    started: Instant,
    last_logged: Option<Instant>,
    completed: bool,
}

impl TaskProgress for LogTask {
    fn report(&mut self, total: u64, current: u64) {
        let due = self
            .last_logged
            .map_or(true, |at| at.elapsed() >= LOG_INTERVAL);

        if due || current == total {
            trace!("{}: {}/{}", self.title, current, total);
            self.last_logged = Some(Instant::now());
        }
    }

    fn complete(&mut self) {
        if !self.completed {
            self.completed = true;
            let elapsed = self.started.elapsed();
            if elapsed >= LOG_INTERVAL {
                info!("{} finished in {:.1}s", self.title, elapsed.as_secs_f64());
            } else {
                debug!("{} finished", self.title);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::RecordingProgress;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_guard_completes_once_on_drop() {
        let progress = RecordingProgress::new();
        {
            let mut guard = TaskGuard::start(&progress, "Copy a.jpg");
            guard.report(10, 5);
            guard.report(10, 10);
        }

        let tasks = progress.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Copy a.jpg");
        assert_eq!(tasks[0].reports, vec![(10, 5), (10, 10)]);
        assert_eq!(tasks[0].completions, 1);
    }

    #[test]
    fn test_guard_completes_on_early_return() {
        fn failing(progress: &RecordingProgress) -> Result<(), String> {
            let _guard = TaskGuard::start(progress, "Download from X");
            Err("boom".to_string())
        }

        let progress = RecordingProgress::new();
        assert!(failing(&progress).is_err());
        assert_eq!(progress.tasks()[0].completions, 1);
    }

    #[test]
    fn test_settle_delay_skipped_on_shutdown() {
        let progress = RecordingProgress::new();
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::SeqCst);

        let start = Instant::now();
        drop(
            TaskGuard::start(&progress, "Download from X")
                .with_settle_delay(Duration::from_secs(30), Arc::clone(&flag)),
        );
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(progress.tasks()[0].completions, 1);
    }

    #[test]
    fn test_log_task_completes_idempotently() {
        let mut task = LogProgress.create_task("Deleting files from X");
        task.report(2, 1);
        task.complete();
        task.complete();
    }
}
