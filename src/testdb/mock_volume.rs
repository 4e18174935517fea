//! Mock volume source and ejector

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::error::{MediaError, Result};
use crate::volume::{Volume, VolumeEjector, VolumeSource};

/// Volume source returning a fixed list
pub struct MockVolumeSource {
    volumes: Vec<Volume>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl MockVolumeSource {
    /// Always report `volumes`
    pub fn new(volumes: Vec<Volume>) -> Self {
        Self {
            volumes,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
            stop_after: None,
        }
    }

    /// Always fail enumeration with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Set `flag` on the `calls`-th enumeration
    pub fn stop_after(mut self, calls: usize, flag: Arc<AtomicBool>) -> Self {
        self.stop_after = Some((calls, flag));
        self
    }

    /// Shared counter of `volumes()` calls
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl VolumeSource for MockVolumeSource {
    fn volumes(&self) -> Result<Vec<Volume>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((limit, flag)) = &self.stop_after {
            if call >= *limit {
                flag.store(true, Ordering::SeqCst);
            }
        }

        match &self.failure {
            Some(message) => Err(MediaError::VolumeEnumeration(message.clone())),
            None => Ok(self.volumes.clone()),
        }
    }
}

/// Ejector that records labels instead of touching hardware
#[derive(Default)]
pub struct MockEjector {
    ejected: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl MockEjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next eject report failure
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Labels passed to `eject`, in order
    pub fn ejected(&self) -> Vec<String> {
        self.ejected.lock().unwrap().clone()
    }
}

impl VolumeEjector for MockEjector {
    fn eject(&self, volume: &Volume) -> bool {
        self.ejected.lock().unwrap().push(volume.label.clone());
        !self.fail_next.swap(false, Ordering::SeqCst)
    }
}
