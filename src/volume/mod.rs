//! Removable volume discovery, ejection and polling
//!
//! # Architecture
//!
//! - [`VolumeSource`] - lists the volumes mounted right now
//! - [`VolumeEjector`] - safely removes a volume
//! - [`Volume`] - what both of them talk about
//! - [`VolumePoller`] - the loop that matches labels and runs operation
//!   sequences against them
//!
//! The system implementations ([`SystemVolumes`], [`SystemEjector`]) are
//! thin adapters over the host OS; tests use the mocks in `testdb`.

mod eject;
mod poller;
mod system;
mod traits;

pub use eject::SystemEjector;
pub use poller::{CycleReport, Services, VolumePoller};
pub use system::SystemVolumes;
pub use traits::{Volume, VolumeEjector, VolumeSource};
