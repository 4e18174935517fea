//! Volume poll loop
//!
//! Every cycle the poller re-reads the configuration, takes one snapshot of
//! the mounted volumes and runs the operation sequence of every media group
//! (then every camera) whose label is present. Sequences run one after
//! another on the calling thread.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::traits::{Volume, VolumeEjector, VolumeSource};
use crate::core::config::{Config, LiveConfig, OperationSpec};
use crate::core::shutdown::{is_shutdown, sleep_unless_shutdown};
use crate::report::{LogNotifier, LogProgress, Notifier, ProgressReporter};
use crate::transfer::{FileOperationRunner, SequenceReport, VolumeOperationSequencer};

/// External collaborators shared by every sequence
#[derive(Clone)]
pub struct Services {
    pub progress: Arc<dyn ProgressReporter>,
    pub notifier: Arc<dyn Notifier>,
    pub ejector: Arc<dyn VolumeEjector>,
}

impl Services {
    /// Log-only progress and notifications with the given ejector
    pub fn logging(ejector: Arc<dyn VolumeEjector>) -> Self {
        Self {
            progress: Arc::new(LogProgress),
            notifier: Arc::new(LogNotifier),
            ejector,
        }
    }
}

/// What happened during one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Volumes in the snapshot
    pub volumes_seen: usize,
    /// Volume enumeration failed; nothing was matched
    pub enumeration_failed: bool,
    /// One entry per sequence run, keyed by the configured label
    pub sequences: Vec<(String, SequenceReport)>,
}

/// Polls for volumes and runs their operation sequences
pub struct VolumePoller<S: VolumeSource> {
    source: S,
    config: LiveConfig,
    services: Services,
    shutdown_flag: Arc<AtomicBool>,
}

impl<S: VolumeSource> VolumePoller<S> {
    pub fn new(
        source: S,
        config: LiveConfig,
        services: Services,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            config,
            services,
            shutdown_flag,
        }
    }

    /// Poll until shutdown is requested
    pub fn run(&mut self) {
        info!("Volume poller started");

        loop {
            if is_shutdown(&self.shutdown_flag) {
                debug!("Poller shutdown requested");
                break;
            }

            self.run_once();

            let interval = self.config.current().poller.interval();
            if !sleep_unless_shutdown(interval, &self.shutdown_flag) {
                break;
            }
        }

        info!("Volume poller stopped");
    }

    /// Run exactly one cycle
    pub fn run_once(&mut self) -> CycleReport {
        let config = self.config.refresh().clone();
        let mut report = CycleReport::default();

        let volumes = match self.source.volumes() {
            Ok(volumes) => volumes,
            Err(e) => {
                warn!("Could not list volumes: {}", e);
                report.enumeration_failed = true;
                return report;
            }
        };
        report.volumes_seen = volumes.len();

        self.process_media_groups(&config, &volumes, &mut report);
        self.process_cameras(&config, &volumes, &mut report);

        report
    }

    fn process_media_groups(&self, config: &Config, volumes: &[Volume], report: &mut CycleReport) {
        for (group, media) in &config.media {
            for label in &media.volume_labels {
                if is_shutdown(&self.shutdown_flag) {
                    return;
                }

                let Some(volume) = volumes.iter().find(|v| v.matches_label(label)) else {
                    continue;
                };

                debug!("Media group '{}' matched {}", group, volume);
                let sequencer = self.sequencer(config, config.poller.eject_delay());
                let outcome = sequencer.run(volume, &media.operations);
                report.sequences.push((label.clone(), outcome));
            }
        }
    }

    fn process_cameras(&self, config: &Config, volumes: &[Volume], report: &mut CycleReport) {
        let cameras = &config.camera_download;
        if cameras.cameras.is_empty() {
            return;
        }

        let target = match cameras.target.as_deref().map(str::trim) {
            Some(target) if !target.is_empty() => target,
            _ => {
                error!("Camera download configuration is missing a target");
                return;
            }
        };

        for (label, camera) in &cameras.cameras {
            if is_shutdown(&self.shutdown_flag) {
                return;
            }

            let Some(volume) = volumes.iter().find(|v| v.matches_label(label)) else {
                continue;
            };
            info!("Camera {} located at {}", label, volume.root.display());

            let operations: Vec<OperationSpec> = match camera.to_operations(target) {
                Some(operations) => operations,
                None => {
                    error!("Camera configuration for {} is missing a source", label);
                    continue;
                }
            };

            let sequencer = self.sequencer(config, Duration::ZERO);
            let outcome = sequencer.run(volume, &operations);
            report.sequences.push((label.clone(), outcome));
        }
    }

    fn sequencer(&self, config: &Config, eject_delay: Duration) -> VolumeOperationSequencer {
        let runner = FileOperationRunner::new(
            config,
            Arc::clone(&self.services.progress),
            Arc::clone(&self.shutdown_flag),
        );

        VolumeOperationSequencer::new(
            runner,
            Arc::clone(&self.services.ejector),
            Arc::clone(&self.services.notifier),
            Arc::clone(&self.shutdown_flag),
        )
        .with_eject_delay(eject_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CameraConfig, CameraOperation, MediaConfig, OperationKind};
    use crate::testdb::{test_config, test_services, write_file, MockEjector, MockVolumeSource};
    use crate::transfer::SequenceOutcome;
    use std::sync::atomic::Ordering;

    fn copy_group(labels: &[&str], target: &std::path::Path) -> MediaConfig {
        MediaConfig {
            volume_labels: labels.iter().map(|l| l.to_string()).collect(),
            operations: vec![OperationSpec::new(OperationKind::Copy)
                .with_source("{ROOT}")
                .with_target(format!("{}/{{filename}}", target.display()))],
        }
    }

    #[test]
    fn test_matches_label_case_insensitively() {
        let card = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        write_file(card.path(), "a.jpg", b"a");

        let mut config = test_config();
        config
            .media
            .insert("sony".into(), copy_group(&["sony_card"], photos.path()));

        let source = MockVolumeSource::new(vec![Volume::new("SONY_CARD", card.path())]);
        let (services, _, notifier) = test_services();
        let flag = Arc::new(AtomicBool::new(false));
        let mut poller = VolumePoller::new(source, LiveConfig::fixed(config), services, flag);

        let report = poller.run_once();
        assert_eq!(report.volumes_seen, 1);
        assert_eq!(report.sequences.len(), 1);
        assert_eq!(report.sequences[0].1.outcome, SequenceOutcome::Completed);
        assert!(photos.path().join("a.jpg").exists());
        assert_eq!(notifier.messages().len(), 1);
    }

    #[test]
    fn test_unmatched_labels_do_nothing() {
        let card = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        write_file(card.path(), "a.jpg", b"a");

        let mut config = test_config();
        config
            .media
            .insert("sony".into(), copy_group(&["OTHER"], photos.path()));

        let source = MockVolumeSource::new(vec![Volume::new("SONY_CARD", card.path())]);
        let (services, _, _) = test_services();
        let mut poller = VolumePoller::new(
            source,
            LiveConfig::fixed(config),
            services,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(poller.run_once().sequences.is_empty());
        assert_eq!(std::fs::read_dir(photos.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_enumeration_failure_skips_cycle() {
        let source = MockVolumeSource::failing("device busy");
        let (services, _, _) = test_services();
        let mut poller = VolumePoller::new(
            source,
            LiveConfig::fixed(test_config()),
            services,
            Arc::new(AtomicBool::new(false)),
        );

        let report = poller.run_once();
        assert!(report.enumeration_failed);
        assert!(report.sequences.is_empty());
    }

    #[test]
    fn test_camera_form_moves_and_ejects() {
        let card = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();
        let source_file = write_file(card.path(), "DCIM/100/IMG_1.JPG", b"img");

        let mut config = test_config();
        config.camera_download.target = Some(format!("{}/{{filename}}", photos.path().display()));
        config.camera_download.cameras.insert(
            "EOS_DIGITAL".into(),
            CameraConfig {
                source: Some("{ROOT}/DCIM".into()),
                operation: CameraOperation::Move,
                eject: true,
            },
        );

        let (services, ejector, notifier) = test_services();
        let mut poller = VolumePoller::new(
            MockVolumeSource::new(vec![Volume::new("eos_digital", card.path())]),
            LiveConfig::fixed(config),
            services,
            Arc::new(AtomicBool::new(false)),
        );

        let report = poller.run_once();
        assert_eq!(
            report.sequences[0].1.outcome,
            SequenceOutcome::Ejected { success: true }
        );
        assert!(!source_file.exists());
        assert!(photos.path().join("IMG_1.JPG").exists());
        assert_eq!(ejector.ejected(), vec!["eos_digital".to_string()]);
        assert!(notifier.messages()[0].ends_with("drive ejected"));
    }

    #[test]
    fn test_camera_form_blank_target_skips_all() {
        let card = tempfile::tempdir().unwrap();
        let file = write_file(card.path(), "a.jpg", b"a");

        let mut config = test_config();
        config.camera_download.target = Some("   ".into());
        config.camera_download.cameras.insert(
            "CAM".into(),
            CameraConfig {
                source: Some("{ROOT}".into()),
                operation: CameraOperation::Move,
                eject: false,
            },
        );

        let (services, _, _) = test_services();
        let mut poller = VolumePoller::new(
            MockVolumeSource::new(vec![Volume::new("CAM", card.path())]),
            LiveConfig::fixed(config),
            services,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(poller.run_once().sequences.is_empty());
        assert!(file.exists());
    }

    #[test]
    fn test_camera_without_source_is_skipped() {
        let card = tempfile::tempdir().unwrap();
        let photos = tempfile::tempdir().unwrap();

        let mut config = test_config();
        config.camera_download.target = Some(format!("{}/{{filename}}", photos.path().display()));
        config
            .camera_download
            .cameras
            .insert("CAM".into(), CameraConfig::default());

        let (services, _, _) = test_services();
        let mut poller = VolumePoller::new(
            MockVolumeSource::new(vec![Volume::new("CAM", card.path())]),
            LiveConfig::fixed(config),
            services,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(poller.run_once().sequences.is_empty());
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let flag = Arc::new(AtomicBool::new(true));
        let (services, _, _) = test_services();
        let source = MockVolumeSource::new(Vec::new());
        let calls = source.calls();
        let mut poller = VolumePoller::new(source, LiveConfig::fixed(test_config()), services, flag);

        poller.run();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_polls_until_shutdown() {
        let flag = Arc::new(AtomicBool::new(false));
        let (services, _, _) = test_services();
        let source = MockVolumeSource::new(Vec::new()).stop_after(2, Arc::clone(&flag));
        let calls = source.calls();

        let mut config = test_config();
        config.poller.interval_secs = 0;
        let mut poller = VolumePoller::new(source, LiveConfig::fixed(config), services, flag);

        poller.run();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_services_logging() {
        let ejector: Arc<dyn VolumeEjector> = Arc::new(MockEjector::new());
        let services = Services::logging(ejector);
        services.notifier.notify("hello");
        let _task = services.progress.create_task("Download from X");
    }
}
