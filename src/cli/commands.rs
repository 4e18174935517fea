//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::categorize::categorize;
use crate::cli::progress::{
    format_bytes, print_error, print_header, print_info, print_success, print_warning,
    ConsoleProgress,
};
use crate::cli::{Args, Commands};
use crate::core::config::{
    get_config_path, init_config, open_config_in_editor, Config, LiveConfig, OperationSpec,
};
use crate::transfer::template;
use crate::transfer::{SequenceOutcome, SequenceReport};
use crate::volume::{
    CycleReport, Services, SystemEjector, SystemVolumes, VolumeEjector, VolumePoller, VolumeSource,
};
use anyhow::{bail, Context, Result};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Run the command selected on the command line
///
/// With no subcommand the poller runs until Ctrl+C.
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        None | Some(Commands::Run) => {
            run_poller(args, shutdown_flag)?;
        }
        Some(Commands::Once) => {
            run_single_cycle(args, config, shutdown_flag)?;
        }
        Some(Commands::Volumes { all, json }) => {
            list_volumes(*all, *json)?;
        }
        Some(Commands::Eject { label }) => {
            eject_volume(label)?;
        }
        Some(Commands::Expand { template, file }) => {
            expand_template(template, file)?;
        }
        Some(Commands::Categorize { files }) => {
            categorize_files(files);
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
    }

    Ok(())
}

// =============================================================================
// Polling
// =============================================================================

/// Progress and notification sinks for the current output mode
fn build_services(quiet: bool) -> Services {
    let ejector: Arc<dyn VolumeEjector> = Arc::new(SystemEjector::new());

    if quiet {
        return Services::logging(ejector);
    }

    let progress = ConsoleProgress::new();
    let notifier = progress.notifier();
    Services {
        progress: Arc::new(progress),
        notifier: Arc::new(notifier),
        ejector,
    }
}

/// Poll until shutdown, re-reading the config file every cycle
pub fn run_poller(args: &Args, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    let live_config = match &args.config {
        Some(path) => LiveConfig::from_path(path.clone()),
        None => LiveConfig::from_default_locations(),
    };

    info!(
        "Watching for volumes (config: {})",
        args.config
            .clone()
            .unwrap_or_else(Config::get_active_config_path)
            .display()
    );
    info!("Press Ctrl+C to stop");

    let mut poller = VolumePoller::new(
        SystemVolumes::new(),
        live_config,
        build_services(args.quiet),
        shutdown_flag,
    );
    poller.run();

    info!("Stopped watching for volumes");
    Ok(())
}

/// Run one cycle with the already loaded configuration and print what happened
pub fn run_single_cycle(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    let mut poller = VolumePoller::new(
        SystemVolumes::new(),
        LiveConfig::fixed(config.clone()),
        build_services(args.quiet),
        shutdown_flag,
    );
    let report = poller.run_once();

    print_cycle_report(&report);

    if report.enumeration_failed {
        bail!("Could not list mounted volumes");
    }
    Ok(())
}

fn print_cycle_report(report: &CycleReport) {
    print_header("POLL CYCLE SUMMARY");

    if report.enumeration_failed {
        print_error("Volume enumeration failed");
        return;
    }

    print_info(&format!("Volumes mounted: {}", report.volumes_seen));
    if report.sequences.is_empty() {
        print_info("No configured volume labels were present");
        return;
    }

    for (label, sequence) in &report.sequences {
        let line = format!("{}: {}", label, describe_sequence(sequence));
        match sequence.outcome {
            SequenceOutcome::Aborted | SequenceOutcome::Ejected { success: false } => {
                print_warning(&line)
            }
            _ if sequence.stats.failed > 0 => print_warning(&line),
            _ => print_success(&line),
        }
    }
    println!();
}

/// One-line summary of a sequence result
fn describe_sequence(report: &SequenceReport) -> String {
    let outcome = match report.outcome {
        SequenceOutcome::Completed => "completed",
        SequenceOutcome::Ejected { success: true } => "completed, ejected",
        SequenceOutcome::Ejected { success: false } => "completed, eject failed",
        SequenceOutcome::Aborted => "stopped by a configuration error",
        SequenceOutcome::Cancelled => "cancelled",
    };

    let stats = &report.stats;
    format!(
        "{} ({} copied, {} duplicates, {} deleted, {} failed, {})",
        outcome,
        stats.copied,
        stats.duplicates,
        stats.deleted,
        stats.failed,
        format_bytes(stats.bytes_copied)
    )
}

// =============================================================================
// Volumes
// =============================================================================

/// List mounted volumes
pub fn list_volumes(all: bool, json: bool) -> Result<()> {
    let volumes: Vec<_> = SystemVolumes::new()
        .volumes()?
        .into_iter()
        .filter(|volume| all || volume.is_removable)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&volumes)?);
        return Ok(());
    }

    if volumes.is_empty() {
        info!("No removable volumes found.");
        if !all {
            info!("Tip: Use 'volumes --all' to include fixed disks");
        }
        return Ok(());
    }

    info!("Found {} volume(s):", volumes.len());
    info!("");
    for (i, volume) in volumes.iter().enumerate() {
        let label = if volume.label.is_empty() {
            "(no label)"
        } else {
            volume.label.as_str()
        };
        info!("[{}] {}", i + 1, label);
        info!("    Root: {}", volume.root.display());
        if !volume.device.is_empty() {
            info!("    Device: {}", volume.device);
        }
        info!("    File system: {}", volume.file_system);
        info!(
            "    Space: {} free of {}",
            format_bytes(volume.available_bytes),
            format_bytes(volume.total_bytes)
        );
        info!("    Removable: {}", volume.is_removable);
        info!("");
    }

    Ok(())
}

/// Eject the first mounted volume with the given label
pub fn eject_volume(label: &str) -> Result<()> {
    let volume = match SystemVolumes::new().find_by_label(label)? {
        Some(volume) => volume,
        None => bail!("No mounted volume is labelled '{}'", label),
    };

    if !SystemEjector::new().eject(&volume) {
        bail!("Failed to eject {}", volume);
    }

    print_success(&format!("Ejected {}", volume));
    Ok(())
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Print the path a template produces for a file
pub fn expand_template(template_text: &str, file: &Path) -> Result<()> {
    let target = template::expand(template_text, file)
        .with_context(|| format!("Failed to expand '{}'", template_text))?;
    println!("{}", target.display());
    Ok(())
}

/// Print the category of each file name
pub fn categorize_files(files: &[String]) {
    for file in files {
        println!("{:<8} {}", categorize(file).to_string(), file);
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Handle the `config` command - open, show path, or reset the config file
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                std::fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Changes are picked up on the next poll cycle; no restart needed.");
            info!("Run 'media-downloader show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            std::fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Add a [media.<name>] group for each card or drive you want handled.");
    info!("");
    info!("Quick tip: Run 'media-downloader volumes' to see the labels of inserted cards.");

    Ok(())
}

fn log_operation(index: usize, operation: &OperationSpec) {
    info!("    {}. {}", index + 1, operation.operation);
    if let Some(source) = &operation.source {
        info!("       source = \"{}\"", source);
    }
    if let Some(target) = &operation.target {
        info!("       target = \"{}\"", target);
    }
    if !operation.masks.is_empty() {
        info!("       masks = {:?}", operation.masks);
    }
    if !operation.subdirectories {
        info!("       subdirectories = false");
    }
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
    info!("");
    info!("[poller]");
    info!("  interval_secs = {}", config.poller.interval_secs);
    info!("  settle_delay_ms = {}", config.poller.settle_delay_ms);
    info!("  eject_delay_ms = {}", config.poller.eject_delay_ms);
    info!("");
    info!("[comparison]");
    info!("  mode = {:?}", config.comparison.mode);
    info!("  prefix_bytes = {}", config.comparison.prefix_bytes);

    if config.media.is_empty() {
        info!("");
        info!("(No media groups configured)");
    }
    for (name, group) in &config.media {
        info!("");
        info!("[media.{}]", name);
        info!("  volume_labels = {:?}", group.volume_labels);
        if group.operations.is_empty() {
            info!("  ⚠ No operations");
        }
        for (i, operation) in group.operations.iter().enumerate() {
            log_operation(i, operation);
        }
    }

    let cameras = &config.camera_download;
    if !cameras.cameras.is_empty() {
        info!("");
        info!("[camera_download]");
        info!(
            "  target = {:?}",
            cameras.target.as_deref().unwrap_or("(not set)")
        );
        for (label, camera) in &cameras.cameras {
            info!(
                "  {} -> source = {:?}, operation = {:?}, eject = {}",
                label,
                camera.source.as_deref().unwrap_or("(not set)"),
                camera.operation,
                camera.eject
            );
        }
    }
}
