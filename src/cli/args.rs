//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Watches for camera cards and removable drives and downloads their media
#[derive(Parser, Debug)]
#[command(name = "media-downloader")]
#[command(author = "Vihaan Reddy M")]
#[command(version = "1.0.0")]
#[command(about = "Copy, move, delete and eject media automatically when a known card or drive is inserted", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log progress instead of drawing progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll for configured volumes until Ctrl+C (the default)
    Run,

    /// Run a single poll cycle and exit
    Once,

    /// List mounted volumes and their labels
    Volumes {
        /// Include volumes the OS does not report as removable
        #[arg(long)]
        all: bool,

        /// Print the volume list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Eject the volume with the given label
    Eject {
        /// Volume label (case-insensitive)
        label: String,
    },

    /// Show where a file would be written by a target template
    ///
    /// Example: media-downloader expand "D:\Photos\{yyyy}\{yyyy-MM-dd}\{filename}" E:\DCIM\IMG_0001.JPG
    Expand {
        /// Target template
        template: String,

        /// Source file whose name and timestamps are used
        file: PathBuf,
    },

    /// Print the category (Movie, Image, Archive, Unwanted, Unknown) of each file
    Categorize {
        /// File names or paths
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Open the configuration file in your default editor
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\media_downloader\config.toml
    /// - Linux: ~/.config/media_downloader/config.toml
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,
}
