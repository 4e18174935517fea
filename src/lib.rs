//! Media Downloader Library
//!
//! Watches for camera memory cards and removable drives by volume label and,
//! when one appears, runs its configured list of Copy, Move, Delete and Eject
//! operations. Target paths are templates (`{filename}`, `{yyyy-MM-dd}`,
//! `{ROOT}` ...) and files whose name is taken get a numbered name unless the
//! existing file already has the same content.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, error types and shutdown helpers
//! - [`volume`] - Volume discovery, ejection and the poll loop
//! - [`transfer`] - Templates, duplicate detection, copying and operation sequences
//! - [`report`] - Progress and notification sinks used by the transfer engine
//! - [`categorize`] - File categorisation by extension
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Mock volumes, recording sinks and end-to-end scenarios
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use media_downloader::core::config::LiveConfig;
//! use media_downloader::volume::{Services, SystemEjector, SystemVolumes, VolumePoller};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! let shutdown_flag = Arc::new(AtomicBool::new(false));
//! let services = Services::logging(Arc::new(SystemEjector::new()));
//!
//! let mut poller = VolumePoller::new(
//!     SystemVolumes::new(),
//!     LiveConfig::from_default_locations(),
//!     services,
//!     shutdown_flag,
//! );
//!
//! // One scan; `run()` keeps polling until the flag is set
//! let report = poller.run_once();
//! println!("{} sequence(s) ran", report.sequences.len());
//! ```
//!
//! # Testing Without a Card
//!
//! `testdb` provides a [`volume::VolumeSource`] backed by temporary
//! directories, an ejector that records what it was asked to eject, and
//! progress/notification sinks that record every call.
//!
//! # Platform Support
//!
//! Windows, Linux and macOS. Volume labels come from `sysinfo` plus
//! `/dev/disk/by-label` on Linux; ejection uses the native tools of each OS.

pub mod categorize;
pub mod cli;
pub mod core;
pub mod report;
pub mod testdb;
pub mod transfer;
pub mod volume;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
