//! Fixture helpers

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::mock_volume::MockEjector;
use super::recording::{RecordingNotifier, RecordingProgress};
use crate::core::config::Config;
use crate::volume::Services;

/// Write `contents` to `root/relative`, creating parent directories.
///
/// Panics on failure; only meant for test setup.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Default configuration with every delay set to zero
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.poller.settle_delay_ms = 0;
    config.poller.eject_delay_ms = 0;
    config
}

/// Recording services plus handles to inspect them
pub fn test_services() -> (Services, Arc<MockEjector>, Arc<RecordingNotifier>) {
    let ejector = Arc::new(MockEjector::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let services = Services {
        progress: Arc::new(RecordingProgress::new()),
        notifier: notifier.clone(),
        ejector: ejector.clone(),
    };
    (services, ejector, notifier)
}
