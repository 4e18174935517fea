//! Progress bar utilities for CLI output
//!
//! This module provides the console implementations of the progress and
//! notification sinks, plus a few output helpers used by the commands.
//!
//! Key features:
//! - One bar per running task, drawn through a shared `MultiProgress`
//! - A fixed pool of display slots so a burst of tasks cannot flood the terminal
//! - Consistent visual styling across all operations

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::report::{Notifier, ProgressReporter, TaskProgress};

/// Maximum number of tasks drawn at once
pub const MAX_VISIBLE_TASKS: usize = 20;

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the spinner style for tasks that have not reported yet
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap()
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷")
}

/// Get the progress bar style for file-count tasks
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap()
        .progress_chars("━━╾─")
}

/// Get the progress bar style for byte-count tasks (single file copies)
fn bytes_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
        .unwrap()
        .progress_chars("━━╾─")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

// ============================================================================
// Display slots
// ============================================================================

/// Fixed-capacity pool of display slots
pub struct SlotPool {
    in_use: Mutex<Vec<bool>>,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            in_use: Mutex::new(vec![false; capacity]),
        }
    }

    /// Claim the lowest free slot, if any
    pub fn acquire(&self) -> Option<usize> {
        let mut in_use = self.in_use.lock().ok()?;
        let slot = in_use.iter().position(|used| !used)?;
        in_use[slot] = true;
        Some(slot)
    }

    /// Return a slot to the pool
    pub fn release(&self, slot: usize) {
        if let Ok(mut in_use) = self.in_use.lock() {
            if let Some(used) = in_use.get_mut(slot) {
                *used = false;
            }
        }
    }

    /// Number of slots currently claimed
    pub fn in_use(&self) -> usize {
        self.in_use
            .lock()
            .map(|in_use| in_use.iter().filter(|used| **used).count())
            .unwrap_or(0)
    }
}

// ============================================================================
// Console progress reporter
// ============================================================================

/// Draws each task as an indicatif bar
pub struct ConsoleProgress {
    multi: MultiProgress,
    slots: Arc<SlotPool>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Draw to a custom target (hidden in tests)
    pub fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            slots: Arc::new(SlotPool::new(MAX_VISIBLE_TASKS)),
        }
    }

    /// Notifier that prints above the bars
    pub fn notifier(&self) -> ConsoleNotifier {
        ConsoleNotifier {
            multi: self.multi.clone(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn create_task(&self, title: &str) -> Box<dyn TaskProgress> {
        let slot = self.slots.acquire();

        let bar = match slot {
            Some(_) => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(80));
                bar
            }
            None => {
                debug!("No display slot free for '{}'", title);
                ProgressBar::hidden()
            }
        };
        bar.set_message(title.to_string());

        Box::new(ConsoleTask {
            bar,
            slot,
            slots: Arc::clone(&self.slots),
            counts_bytes: title.starts_with("Copy "),
            started: false,
            completed: false,
        })
    }
}

struct ConsoleTask {
    bar: ProgressBar,
    slot: Option<usize>,
    slots: Arc<SlotPool>,
    counts_bytes: bool,
    started: bool,
    completed: bool,
}

impl TaskProgress for ConsoleTask {
    fn report(&mut self, total: u64, current: u64) {
        if !self.started {
            self.started = true;
            self.bar.set_style(if self.counts_bytes {
                bytes_bar_style()
            } else {
                progress_bar_style()
            });
        }
        self.bar.set_length(total);
        self.bar.set_position(current);
    }

    fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.bar.finish_and_clear();
        if let Some(slot) = self.slot.take() {
            self.slots.release(slot);
        }
    }
}

impl Drop for ConsoleTask {
    fn drop(&mut self) {
        self.complete();
    }
}

/// Prints notifications above the progress bars
pub struct ConsoleNotifier {
    multi: MultiProgress,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        info!("{}", message);
        let _ = self.multi.suspend(|| {
            println!("  ✓ {}", message);
        });
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================
