//! Progress and notification sinks that remember everything

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::report::{Notifier, ProgressReporter, TaskProgress};

/// Everything one task received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedTask {
    pub title: String,
    pub reports: Vec<(u64, u64)>,
    pub completions: usize,
}

/// Progress reporter that records tasks for later assertions
#[derive(Default)]
pub struct RecordingProgress {
    tasks: Arc<Mutex<Vec<RecordedTask>>>,
    reports_seen: Arc<AtomicUsize>,
    cancel_after: Option<(Arc<AtomicBool>, usize)>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `flag` once `reports` progress reports have arrived (across all tasks)
    pub fn cancel_after_reports(mut self, flag: Arc<AtomicBool>, reports: usize) -> Self {
        self.cancel_after = Some((flag, reports));
        self
    }

    /// Snapshot of all tasks created so far
    pub fn tasks(&self) -> Vec<RecordedTask> {
        self.tasks.lock().unwrap().clone()
    }

    /// First task whose title starts with `prefix`
    pub fn task(&self, prefix: &str) -> Option<RecordedTask> {
        self.tasks().into_iter().find(|t| t.title.starts_with(prefix))
    }
}

impl ProgressReporter for RecordingProgress {
    fn create_task(&self, title: &str) -> Box<dyn TaskProgress> {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(RecordedTask {
            title: title.to_string(),
            ..Default::default()
        });

        Box::new(RecordingTask {
            index: tasks.len() - 1,
            tasks: Arc::clone(&self.tasks),
            reports_seen: Arc::clone(&self.reports_seen),
            cancel_after: self.cancel_after.clone(),
        })
    }
}

struct RecordingTask {
    index: usize,
    tasks: Arc<Mutex<Vec<RecordedTask>>>,
    reports_seen: Arc<AtomicUsize>,
    cancel_after: Option<(Arc<AtomicBool>, usize)>,
}

impl TaskProgress for RecordingTask {
    fn report(&mut self, total: u64, current: u64) {
        self.tasks.lock().unwrap()[self.index]
            .reports
            .push((total, current));

        let seen = self.reports_seen.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((flag, limit)) = &self.cancel_after {
            if seen >= *limit {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }

    fn complete(&mut self) {
        self.tasks.lock().unwrap()[self.index].completions += 1;
    }
}

/// Notifier that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
