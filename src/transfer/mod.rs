//! Media transfer engine
//!
//! Everything that happens once a volume has been matched:
//!
//! - `template` - target path expansion (`{filename}`, date tokens, `{ROOT}`)
//! - `compare` - duplicate detection by content
//! - `resolver` - free / numbered / skip decision for a target path
//! - `copier` - chunked copy with progress and metadata
//! - `masks` - filename glob filtering
//! - `runner` - Copy, Move and Delete over a source directory
//! - `sequencer` - one volume's ordered operation list

pub mod compare;
pub mod copier;
pub mod masks;
pub mod resolver;
pub mod runner;
pub mod sequencer;
pub mod template;

pub use compare::FileComparator;
pub use copier::{CopyOutcome, FileCopier};
pub use masks::FileMask;
pub use resolver::{Resolution, UniqueTargetResolver};
pub use runner::{find_files, FileOperationRunner, TransferStats};
pub use sequencer::{SequenceOutcome, SequenceReport, VolumeOperationSequencer};
