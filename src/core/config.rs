//! Configuration module for the media downloader
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\media_downloader\config.toml
//! - Linux: ~/.config/media_downloader/config.toml
//! - macOS: ~/Library/Application Support/media_downloader/config.toml
//!
//! The poller re-reads the file every cycle through [`LiveConfig`], so edits
//! take effect without a restart.

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Application name used for config directory
const APP_NAME: &str = "media_downloader";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config files checked in the working directory before the standard location
const LOCAL_CONFIG_FILES: [&str; 2] = ["./config.toml", "./media_downloader.toml"];

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Creates the config directory and writes the example config.
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Open the configuration file with the platform's default application.
///
/// Creates the file first if needed. Returns the path that was opened.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config()?;

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]).arg(&config_path);
        command
    };

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut command = std::process::Command::new("open");
        command.arg(&config_path);
        command
    };

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = {
        let mut command = std::process::Command::new("xdg-open");
        command.arg(&config_path);
        command
    };

    command
        .spawn()
        .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;

    Ok(config_path)
}

// =============================================================================
// Operations
// =============================================================================

/// Kind of file operation performed against a matched volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Copy matching files to the target template
    Copy,
    /// Copy matching files, then delete the source
    Move,
    /// Delete matching files from the source
    Delete,
    /// Eject the volume and end the sequence
    Eject,
    /// Missing or unrecognised operation name
    #[default]
    Unknown,
}

impl FromStr for OperationKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "copy" => OperationKind::Copy,
            "move" => OperationKind::Move,
            "delete" => OperationKind::Delete,
            "eject" => OperationKind::Eject,
            _ => OperationKind::Unknown,
        })
    }
}

impl<'de> Deserialize<'de> for OperationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(name.parse().unwrap_or_default())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Copy => "Copy",
            OperationKind::Move => "Move",
            OperationKind::Delete => "Delete",
            OperationKind::Eject => "Eject",
            OperationKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One step of a volume's operation sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationSpec {
    /// What to do
    pub operation: OperationKind,

    /// Source directory template, `{ROOT}` is the volume root
    pub source: Option<String>,

    /// Target path template, e.g. `D:\Photos\{yyyy}\{yyyy-MM-dd}\{filename}`
    pub target: Option<String>,

    /// Filename masks (globs); empty means every file
    pub masks: Vec<String>,

    /// Descend into subdirectories of the source
    pub subdirectories: bool,
}

impl Default for OperationSpec {
    fn default() -> Self {
        Self {
            operation: OperationKind::Unknown,
            source: None,
            target: None,
            masks: Vec::new(),
            subdirectories: true,
        }
    }
}

impl OperationSpec {
    /// Create an operation of the given kind with default settings
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            ..Default::default()
        }
    }

    /// Set the source template
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the target template
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add a filename mask
    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.masks.push(mask.into());
        self
    }

    /// Set whether subdirectories are scanned
    pub fn subdirectories(mut self, value: bool) -> Self {
        self.subdirectories = value;
        self
    }
}

/// A media group: volume labels bound to an ordered operation list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Volume labels (case-insensitive) this group applies to
    pub volume_labels: Vec<String>,

    /// Operations executed in order on a matched volume
    pub operations: Vec<OperationSpec>,
}

// =============================================================================
// Camera form
// =============================================================================

/// Operation used by the simple camera form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraOperation {
    #[default]
    #[serde(alias = "Copy")]
    Copy,
    #[serde(alias = "Move")]
    Move,
}

/// One camera keyed by its volume label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Source directory template, `{ROOT}` is the volume root
    pub source: Option<String>,

    /// Copy or move
    pub operation: CameraOperation,

    /// Eject the card once downloading finishes
    pub eject: bool,
}

impl CameraConfig {
    /// Build the equivalent operation sequence using the shared target template.
    ///
    /// Returns `None` when the camera has no source.
    pub fn to_operations(&self, target: &str) -> Option<Vec<OperationSpec>> {
        let source = self.source.as_ref()?;
        let kind = match self.operation {
            CameraOperation::Copy => OperationKind::Copy,
            CameraOperation::Move => OperationKind::Move,
        };

        let mut operations = vec![OperationSpec::new(kind)
            .with_source(source.clone())
            .with_target(target)
            .with_mask("*")];
        if self.eject {
            operations.push(OperationSpec::new(OperationKind::Eject));
        }
        Some(operations)
    }
}

/// Simple single-target camera download settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDownloadConfig {
    /// Target template shared by every camera
    pub target: Option<String>,

    /// Cameras keyed by volume label
    pub cameras: BTreeMap<String, CameraConfig>,
}

// =============================================================================
// Engine settings
// =============================================================================

/// How duplicate candidates are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Compare only the first `prefix_bytes` of each file
    #[default]
    Prefix,
    /// Compare lengths, then every byte
    Full,
}

/// Duplicate comparison settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Comparison mode
    pub mode: ComparisonMode,

    /// Prefix size in bytes for `prefix` mode
    pub prefix_bytes: usize,
}

/// Poll loop timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between volume scans
    pub interval_secs: u64,

    /// Pause before a finished progress task is closed (milliseconds)
    pub settle_delay_ms: u64,

    /// Pause before an Eject step runs (milliseconds)
    pub eject_delay_ms: u64,
}

impl PollerConfig {
    /// Delay between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Delay before a task completion is signalled
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Delay before ejecting a volume
    pub fn eject_delay(&self) -> Duration {
        Duration::from_millis(self.eject_delay_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings
    pub logging: LoggingConfig,

    /// Poll loop timings
    pub poller: PollerConfig,

    /// Duplicate comparison settings
    pub comparison: ComparisonConfig,

    /// Media groups keyed by a logical name
    pub media: BTreeMap<String, MediaConfig>,

    /// Simple camera form
    pub camera_download: CameraDownloadConfig,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::Prefix,
            prefix_bytes: 64 * 1024,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            settle_delay_ms: 1000,
            eject_delay_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./media_downloader.log"),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        Self::from_toml_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Find the first existing config file
    ///
    /// Search order:
    /// 1. ./config.toml
    /// 2. ./media_downloader.toml
    /// 3. Standard config location
    pub fn find_config_file() -> Option<PathBuf> {
        LOCAL_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .chain(get_config_path())
            .find(|path| path.exists())
    }

    /// Load configuration from default locations
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        Self::find_config_file()
            .or_else(get_config_path)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILES[0]))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

// =============================================================================
// Live reload
// =============================================================================

/// Configuration re-read at the start of every poll cycle.
///
/// A missing file yields the default (empty) configuration. A file that
/// fails to parse keeps the last configuration that loaded successfully.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    path: Option<PathBuf>,
    reload: bool,
    current: Config,
}

impl LiveConfig {
    /// Follow an explicit config file
    pub fn from_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            reload: true,
            current: Config::default(),
        }
    }

    /// Follow the default search locations
    pub fn from_default_locations() -> Self {
        Self {
            path: None,
            reload: true,
            current: Config::default(),
        }
    }

    /// Never reload; always use the given configuration
    pub fn fixed(config: Config) -> Self {
        Self {
            path: None,
            reload: false,
            current: config,
        }
    }

    /// Reload if configured to, then return the configuration for this cycle
    pub fn refresh(&mut self) -> &Config {
        if self.reload {
            let loaded = match &self.path {
                Some(path) if !path.exists() => Ok(Config::default()),
                Some(path) => Config::load(path),
                None => Config::load_default(),
            };

            match loaded {
                Ok(config) => {
                    debug!("Configuration reloaded");
                    self.current = config;
                }
                Err(e) => warn!("{} (keeping previous configuration)", e),
            }
        }
        &self.current
    }

    /// Configuration from the most recent refresh
    pub fn current(&self) -> &Config {
        &self.current
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// Failed to open the config file in an editor
    OpenError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), err)
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), err)
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::OpenError(path, err) => {
                write!(f, "Failed to open config file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
