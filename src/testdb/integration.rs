//! End-to-end scenarios through the poller with mock volumes
//!
//! Each test builds a fake card in a temporary directory, configures a media
//! group for it and runs one poll cycle.

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::{test_config, test_services, write_file, MockEjector, MockVolumeSource, RecordingNotifier};
use crate::core::config::{Config, LiveConfig, MediaConfig, OperationKind, OperationSpec};
use crate::transfer::{SequenceOutcome, SequenceReport};
use crate::volume::{Volume, VolumePoller};

struct Scenario {
    card: tempfile::TempDir,
    photos: tempfile::TempDir,
    config: Config,
}

impl Scenario {
    fn new() -> Self {
        Self {
            card: tempfile::tempdir().unwrap(),
            photos: tempfile::tempdir().unwrap(),
            config: test_config(),
        }
    }

    fn target(&self) -> String {
        format!("{}/{{filename}}", self.photos.path().display())
    }

    fn with_operations(mut self, operations: Vec<OperationSpec>) -> Self {
        self.config.media.insert(
            "card".to_string(),
            MediaConfig {
                volume_labels: vec!["CARD".to_string()],
                operations,
            },
        );
        self
    }

    fn run(&self) -> (Vec<SequenceReport>, Arc<MockEjector>, Arc<RecordingNotifier>) {
        let (services, ejector, notifier) = test_services();
        let source = MockVolumeSource::new(vec![Volume::new("CARD", self.card.path())]);
        let mut poller = VolumePoller::new(
            source,
            LiveConfig::fixed(self.config.clone()),
            services,
            Arc::new(AtomicBool::new(false)),
        );

        let reports = poller
            .run_once()
            .sequences
            .into_iter()
            .map(|(_, report)| report)
            .collect();
        (reports, ejector, notifier)
    }
}

fn count_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

#[test]
fn copy_twice_leaves_one_copy_each() {
    let scenario = Scenario::new();
    write_file(scenario.card.path(), "DCIM/a.jpg", b"alpha");
    write_file(scenario.card.path(), "DCIM/b.jpg", b"beta");
    let scenario = {
        let target = scenario.target();
        scenario.with_operations(vec![OperationSpec::new(OperationKind::Copy)
            .with_source("{ROOT}/DCIM")
            .with_target(target)])
    };

    let (first, _, _) = scenario.run();
    assert_eq!(first[0].stats.copied, 2);

    let (second, _, _) = scenario.run();
    assert_eq!(second[0].stats.copied, 0);
    assert_eq!(second[0].stats.duplicates, 2);
    assert_eq!(count_files(scenario.photos.path()), 2);
}

#[test]
fn move_leaves_exactly_one_target() {
    let scenario = Scenario::new();
    let source = write_file(scenario.card.path(), "DCIM/clip.mp4", b"movie bytes");
    let scenario = {
        let target = scenario.target();
        scenario.with_operations(vec![OperationSpec::new(OperationKind::Move)
            .with_source("{ROOT}")
            .with_target(target)
            .with_mask("*.MP4")])
    };

    let (reports, _, notifier) = scenario.run();
    assert_eq!(reports[0].outcome, SequenceOutcome::Completed);
    assert!(!source.exists());
    assert_eq!(count_files(scenario.photos.path()), 1);
    assert_eq!(
        fs::read(scenario.photos.path().join("clip.mp4")).unwrap(),
        b"movie bytes"
    );
    assert_eq!(notifier.messages().len(), 1);
}

#[test]
fn move_with_identical_target_skips_and_deletes_source() {
    let scenario = Scenario::new();
    let source = write_file(scenario.card.path(), "a.jpg", b"same");
    write_file(scenario.photos.path(), "a.jpg", b"same");
    let scenario = {
        let target = scenario.target();
        scenario.with_operations(vec![OperationSpec::new(OperationKind::Move)
            .with_source("{ROOT}")
            .with_target(target)])
    };

    let (reports, _, _) = scenario.run();
    assert_eq!(reports[0].stats.duplicates, 1);
    assert_eq!(reports[0].stats.deleted, 1);
    assert!(!source.exists());
    assert_eq!(count_files(scenario.photos.path()), 1);
}

#[test]
fn different_content_gets_numbered_name() {
    let scenario = Scenario::new();
    write_file(scenario.card.path(), "b.jpg", b"new content");
    write_file(scenario.photos.path(), "b.jpg", b"old content");
    let scenario = {
        let target = scenario.target();
        scenario.with_operations(vec![OperationSpec::new(OperationKind::Copy)
            .with_source("{ROOT}")
            .with_target(target)])
    };

    scenario.run();
    assert_eq!(
        fs::read(scenario.photos.path().join("b.jpg")).unwrap(),
        b"old content"
    );
    assert_eq!(
        fs::read(scenario.photos.path().join("b (2).jpg")).unwrap(),
        b"new content"
    );
}

#[test]
fn eject_step_ends_sequence() {
    let scenario = Scenario::new();
    write_file(scenario.card.path(), "a.jpg", b"a");
    let trailing = tempfile::tempdir().unwrap();
    let scenario = {
        let target = scenario.target();
        scenario.with_operations(vec![
            OperationSpec::new(OperationKind::Copy)
                .with_source("{ROOT}")
                .with_target(target),
            OperationSpec::new(OperationKind::Eject),
            OperationSpec::new(OperationKind::Copy)
                .with_source("{ROOT}")
                .with_target(format!("{}/{{filename}}", trailing.path().display())),
        ])
    };

    let (reports, ejector, notifier) = scenario.run();
    assert_eq!(reports[0].outcome, SequenceOutcome::Ejected { success: true });
    assert_eq!(ejector.ejected(), vec!["CARD".to_string()]);
    assert!(notifier.messages()[0].ends_with(", drive ejected"));
    assert_eq!(count_files(trailing.path()), 0);
}

#[test]
fn unknown_operation_touches_nothing() {
    let scenario = Scenario::new();
    let file = write_file(scenario.card.path(), "a.jpg", b"a");
    let scenario = {
        let target = scenario.target();
        let parsed = Config::from_toml_str(&format!(
            r#"
            [[media.card.operations]]
            operation = "teleport"
            source = "{{ROOT}}"
            target = "{}"
            "#,
            target.replace('\\', "\\\\")
        ))
        .unwrap();
        scenario.with_operations(parsed.media["card"].operations.clone())
    };

    let (reports, ejector, notifier) = scenario.run();
    assert_eq!(reports[0].outcome, SequenceOutcome::Aborted);
    assert!(file.exists());
    assert_eq!(count_files(scenario.photos.path()), 0);
    assert!(ejector.ejected().is_empty());
    assert!(notifier.messages().is_empty());
}

#[test]
fn date_template_routes_into_folders() {
    let scenario = Scenario::new();
    let source = write_file(scenario.card.path(), "DCIM/IMG_1.JPG", b"img");
    let scenario = {
        let target = format!(
            "{}/{{yyyy}}/{{yyyy-MM-dd}}/{{filename}}",
            scenario.photos.path().display()
        );
        scenario.with_operations(vec![OperationSpec::new(OperationKind::Copy)
            .with_source("{ROOT}/DCIM")
            .with_target(target)])
    };

    let metadata = fs::metadata(&source).unwrap();
    let stamp = chrono::DateTime::<chrono::Local>::from(
        metadata.created().or_else(|_| metadata.modified()).unwrap(),
    );

    scenario.run();
    let expected = scenario
        .photos
        .path()
        .join(stamp.format("%Y").to_string())
        .join(stamp.format("%Y-%m-%d").to_string())
        .join("IMG_1.JPG");
    assert!(expected.exists(), "missing {}", expected.display());
}

#[test]
fn delete_then_top_level_copy() {
    let scenario = Scenario::new();
    let junk = write_file(scenario.card.path(), "junk.url", b"x");
    write_file(scenario.card.path(), "top.jpg", b"top");
    write_file(scenario.card.path(), "nested/deep.jpg", b"deep");
    let scenario = {
        let target = scenario.target();
        scenario.with_operations(vec![
            OperationSpec::new(OperationKind::Delete)
                .with_source("{ROOT}")
                .with_mask("*.url"),
            OperationSpec::new(OperationKind::Copy)
                .with_source("{ROOT}")
                .with_target(target)
                .with_mask("*.*")
                .subdirectories(false),
        ])
    };

    let (reports, _, _) = scenario.run();
    assert_eq!(reports[0].stats.deleted, 1);
    assert_eq!(reports[0].stats.copied, 1);
    assert!(!junk.exists());
    assert!(scenario.photos.path().join("top.jpg").exists());
    assert!(!scenario.photos.path().join("deep.jpg").exists());
}
