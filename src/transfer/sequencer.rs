//! Ordered execution of one volume's operations

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::runner::{FileOperationRunner, TransferStats};
use super::template::substitute_root;
use crate::core::config::{OperationKind, OperationSpec};
use crate::core::error::{MediaError, Result};
use crate::core::shutdown::{is_shutdown, sleep_unless_shutdown};
use crate::report::Notifier;
use crate::volume::{Volume, VolumeEjector};

/// How a sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every operation ran; no Eject step
    Completed,
    /// An Eject step ran and ended the sequence
    Ejected { success: bool },
    /// Misconfiguration stopped the sequence
    Aborted,
    /// Shutdown was requested
    Cancelled,
}

/// Outcome plus the statistics of every operation that ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceReport {
    pub outcome: SequenceOutcome,
    pub stats: TransferStats,
}

impl SequenceReport {
    fn new(outcome: SequenceOutcome, stats: TransferStats) -> Self {
        Self { outcome, stats }
    }
}

/// Check that `operation` has what it needs before it runs
pub fn validate(operation: &OperationSpec, label: &str) -> Result<()> {
    let kind = operation.operation;
    let missing = |field: &str| -> Result<()> {
        Err(MediaError::Configuration(format!(
            "A {} operation for {} is missing {}",
            kind, label, field
        )))
    };

    match kind {
        OperationKind::Unknown => Err(MediaError::Configuration(format!(
            "An invalid operation is specified for {}",
            label
        ))),
        OperationKind::Copy | OperationKind::Move if operation.source.is_none() => {
            missing("source")
        }
        OperationKind::Copy | OperationKind::Move if operation.target.is_none() => {
            missing("target")
        }
        OperationKind::Delete if operation.source.is_none() => missing("source"),
        _ => Ok(()),
    }
}

/// Runs a matched volume's operation list in order
pub struct VolumeOperationSequencer {
    runner: FileOperationRunner,
    ejector: Arc<dyn VolumeEjector>,
    notifier: Arc<dyn Notifier>,
    shutdown_flag: Arc<AtomicBool>,
    eject_delay: Duration,
}

impl VolumeOperationSequencer {
    pub fn new(
        runner: FileOperationRunner,
        ejector: Arc<dyn VolumeEjector>,
        notifier: Arc<dyn Notifier>,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            runner,
            ejector,
            notifier,
            shutdown_flag,
            eject_delay: Duration::ZERO,
        }
    }

    /// Wait this long before an Eject step
    pub fn with_eject_delay(mut self, delay: Duration) -> Self {
        self.eject_delay = delay;
        self
    }

    /// Execute `operations` against `volume`.
    ///
    /// Steps are validated as they are reached, so steps before an invalid
    /// one still run. A runtime failure in one step (such as a missing
    /// source directory) is logged and the next step runs.
    pub fn run(&self, volume: &Volume, operations: &[OperationSpec]) -> SequenceReport {
        let label = volume.label.as_str();
        let mut stats = TransferStats::default();

        if operations.is_empty() {
            error!("No operations specified for {}", label);
            return SequenceReport::new(SequenceOutcome::Aborted, stats);
        }

        info!("Processing {} ({} operations)", volume, operations.len());
        let root = volume.root_for_template();

        for operation in operations {
            if is_shutdown(&self.shutdown_flag) {
                debug!("Shutdown requested, stopping operations for {}", label);
                return SequenceReport::new(SequenceOutcome::Cancelled, stats);
            }

            if let Err(e) = validate(operation, label) {
                error!("{}", e);
                return SequenceReport::new(SequenceOutcome::Aborted, stats);
            }

            let source = operation
                .source
                .as_deref()
                .map(|s| substitute_root(s, &root))
                .unwrap_or_default();
            let target = operation
                .target
                .as_deref()
                .map(|t| substitute_root(t, &root))
                .unwrap_or_default();

            let result = match operation.operation {
                OperationKind::Copy | OperationKind::Move => self.runner.transfer_files(
                    Path::new(&source),
                    &target,
                    operation.masks.as_slice(),
                    operation.subdirectories,
                    operation.operation == OperationKind::Move,
                ),
                OperationKind::Delete => self.runner.delete_files(
                    Path::new(&source),
                    operation.masks.as_slice(),
                    operation.subdirectories,
                ),
                OperationKind::Eject => {
                    let outcome = self.eject(volume);
                    return SequenceReport::new(outcome, stats);
                }
                OperationKind::Unknown => {
                    return SequenceReport::new(SequenceOutcome::Aborted, stats);
                }
            };

            match result {
                Ok(operation_stats) => stats.merge(&operation_stats),
                Err(e) => error!("{} operation for {} failed: {}", operation.operation, label, e),
            }
        }

        if is_shutdown(&self.shutdown_flag) {
            return SequenceReport::new(SequenceOutcome::Cancelled, stats);
        }

        self.notifier.notify(&format!(
            "Finished downloading files from '{}'",
            volume.root.display()
        ));
        SequenceReport::new(SequenceOutcome::Completed, stats)
    }

    fn eject(&self, volume: &Volume) -> SequenceOutcome {
        if !sleep_unless_shutdown(self.eject_delay, &self.shutdown_flag) {
            return SequenceOutcome::Cancelled;
        }

        let success = self.ejector.eject(volume);
        if !success {
            warn!("{} could not be ejected", volume);
        }

        self.notifier.notify(&format!(
            "Finished downloading files from '{}', drive ejected",
            volume.root.display()
        ));
        SequenceOutcome::Ejected { success }
    }
}
