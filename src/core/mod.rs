//! Core functionality module
//!
//! This module contains the pieces shared by every other part of the
//! downloader: configuration management, error types and the cooperative
//! shutdown helpers.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving and live reload
//! - `error` - Error types and result aliases
//! - `shutdown` - Shutdown flag checks and interruptible sleeps

pub mod config;
pub mod error;
pub mod shutdown;
