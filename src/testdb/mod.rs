//! Test Database Module
//!
//! Mocks and fixtures for exercising the downloader without real removable
//! media. A temporary directory plays the memory card, [`MockVolumeSource`]
//! reports it under a label and the recording sinks capture what the user
//! would have seen.
//!
//! # Contents
//!
//! - [`MockVolumeSource`] - fixed volume list, optional failure, call counting
//! - [`MockEjector`] - records ejected labels, can be told to fail
//! - [`RecordingProgress`] / [`RecordingNotifier`] - capture progress tasks and notifications
//! - [`write_file`], [`test_config`], [`test_services`] - fixture helpers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use media_downloader::core::config::LiveConfig;
//! use media_downloader::testdb::{test_config, test_services, MockVolumeSource};
//! use media_downloader::volume::{Volume, VolumePoller};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! let source = MockVolumeSource::new(vec![Volume::new("EOS_DIGITAL", "/tmp/card")]);
//! let (services, _ejector, notifier) = test_services();
//! let mut poller = VolumePoller::new(
//!     source,
//!     LiveConfig::fixed(test_config()),
//!     services,
//!     Arc::new(AtomicBool::new(false)),
//! );
//! poller.run_once();
//! println!("{:?}", notifier.messages());
//! ```

#![allow(dead_code)]

mod fixtures;
mod mock_volume;
mod recording;

#[cfg(test)]
mod integration;

pub use fixtures::{test_config, test_services, write_file};
pub use mock_volume::{MockEjector, MockVolumeSource};
pub use recording::{RecordedTask, RecordingNotifier, RecordingProgress};
