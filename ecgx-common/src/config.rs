//! Configuration loading and resolution
//!
//! Settings come from four sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`ECGX_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults (loader parameters only)
//!
//! Directory paths have no built-in defaults. A run that needs the dataset
//! directory and cannot resolve it fails with [`Error::Config`].
//!
//! The TOML file is located by `--config`, then `ECGX_CONFIG`, then
//! `<user config dir>/ecgx/config.toml`. A missing file at the implicit
//! location is not an error: defaults are used and a warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const ENV_CONFIG: &str = "ECGX_CONFIG";
pub const ENV_DATASET_DIR: &str = "ECGX_DATASET_DIR";
pub const ENV_MODEL_DIR: &str = "ECGX_MODEL_DIR";
pub const ENV_LOG_DIR: &str = "ECGX_LOG_DIR";
pub const ENV_SAMPLING_RATE: &str = "ECGX_SAMPLING_RATE";
pub const ENV_SEED: &str = "ECGX_SEED";
pub const ENV_BATCH_SIZE: &str = "ECGX_BATCH_SIZE";

/// Sampling rates with a matching filename column in the metadata table
pub const SUPPORTED_SAMPLING_RATES: [u32; 2] = [100, 500];

/// Log file name used when only a log directory is configured
pub const DEFAULT_LOG_FILE_NAME: &str = "ecgx.log";

/// Configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Filesystem locations (all optional in the file)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Dataset root holding the metadata table, `RECORDS` and record files
    #[serde(default)]
    pub dataset_dir: Option<PathBuf>,

    /// Directory for model graph exports and run configuration snapshots
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    /// Directory for log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Feedback CSV path
    #[serde(default)]
    pub feedback_log: Option<PathBuf>,
}

/// Data loading and batching parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Sampling rate in Hz; selects the low-rate or high-rate filename column
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,

    /// Fixed recording duration after truncation/padding
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_epochs")]
    pub epochs: u32,

    /// Seed for shuffling and the train/validation split
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f64,

    /// Capacity of the bounded batch prefetch queue
    #[serde(default = "default_prefetch_batches")]
    pub prefetch_batches: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            sampling_rate: default_sampling_rate(),
            duration_seconds: default_duration_seconds(),
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            seed: default_seed(),
            validation_fraction: default_validation_fraction(),
            prefetch_batches: default_prefetch_batches(),
        }
    }
}

impl LoaderConfig {
    /// Number of samples per channel after truncation/padding
    pub fn target_samples(&self) -> usize {
        self.duration_seconds as usize * self.sampling_rate as usize
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_SAMPLING_RATES.contains(&self.sampling_rate) {
            return Err(Error::Config(format!(
                "Unsupported sampling rate {} Hz (expected one of {:?})",
                self.sampling_rate, SUPPORTED_SAMPLING_RATES
            )));
        }
        if self.duration_seconds == 0 {
            return Err(Error::Config("duration_seconds must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".to_string()));
        }
        if self.prefetch_batches == 0 {
            return Err(Error::Config("prefetch_batches must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(Error::Config(format!(
                "validation_fraction must be in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if neither this nor
    /// `paths.log_dir` is set)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_sampling_rate() -> u32 {
    500
}

fn default_duration_seconds() -> u32 {
    10
}

fn default_batch_size() -> usize {
    32
}

fn default_epochs() -> u32 {
    30
}

fn default_seed() -> u64 {
    42
}

fn default_validation_fraction() -> f64 {
    0.2
}

fn default_prefetch_batches() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Locate and load the configuration file
    ///
    /// An explicit path (CLI or `ECGX_CONFIG`) must exist. The implicit
    /// per-user location is optional.
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            info!("Loading configuration from {} (command line)", path.display());
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(ENV_CONFIG) {
            let path = PathBuf::from(path);
            info!("Loading configuration from {} ({})", path.display(), ENV_CONFIG);
            return Self::load(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "No configuration file at {}, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine user config directory, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// `<user config dir>/ecgx/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ecgx").join("config.toml"))
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = target.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, target)?;
    debug!("Wrote configuration to {}", target.display());
    Ok(())
}

/// Command-line overrides (highest priority)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset_dir: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub sampling_rate: Option<u32>,
    pub seed: Option<u64>,
    pub batch_size: Option<usize>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dataset_dir: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub feedback_log: Option<PathBuf>,
    pub loader: LoaderConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Merge overrides, environment and file values
    pub fn resolve(overrides: &ConfigOverrides, file: &TomlConfig) -> Result<Self> {
        let dataset_dir = pick(
            overrides.dataset_dir.clone(),
            env_path(ENV_DATASET_DIR),
            file.paths.dataset_dir.clone(),
        );
        let model_dir = pick(
            overrides.model_dir.clone(),
            env_path(ENV_MODEL_DIR),
            file.paths.model_dir.clone(),
        );
        let log_dir = pick(
            overrides.log_dir.clone(),
            env_path(ENV_LOG_DIR),
            file.paths.log_dir.clone(),
        );

        let mut loader = file.loader.clone();
        if let Some(rate) = pick(overrides.sampling_rate, env_parse(ENV_SAMPLING_RATE)?, None) {
            loader.sampling_rate = rate;
        }
        if let Some(seed) = pick(overrides.seed, env_parse(ENV_SEED)?, None) {
            loader.seed = seed;
        }
        if let Some(batch_size) = pick(overrides.batch_size, env_parse(ENV_BATCH_SIZE)?, None) {
            loader.batch_size = batch_size;
        }
        loader.validate()?;

        Ok(Self {
            dataset_dir,
            model_dir,
            log_dir,
            feedback_log: file.paths.feedback_log.clone(),
            loader,
            logging: file.logging.clone(),
        })
    }

    /// Dataset directory, required by any command that reads records
    pub fn require_dataset_dir(&self) -> Result<&Path> {
        self.dataset_dir.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "Dataset directory not configured. Set one of:\n\
                 1. Command line: --dataset-dir <path>\n\
                 2. Environment: {}=<path>\n\
                 3. TOML config: [paths] dataset_dir = \"<path>\"",
                ENV_DATASET_DIR
            ))
        })
    }

    /// Feedback CSV location: explicit path, else `<model_dir>/feedback.csv`
    pub fn require_feedback_log(&self) -> Result<PathBuf> {
        if let Some(path) = &self.feedback_log {
            return Ok(path.clone());
        }
        self.model_dir
            .as_ref()
            .map(|dir| dir.join("feedback.csv"))
            .ok_or_else(|| {
                Error::Config(
                    "Feedback log location not configured (set paths.feedback_log or model_dir)"
                        .to_string(),
                )
            })
    }

    /// Log file: explicit `logging.file`, else `<log_dir>/ecgx.log`, else none
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging
            .file
            .clone()
            .or_else(|| self.log_dir.as_ref().map(|d| d.join(DEFAULT_LOG_FILE_NAME)))
    }

    /// Snapshot of the resolved values in file form
    pub fn to_toml_config(&self) -> TomlConfig {
        TomlConfig {
            paths: PathsConfig {
                dataset_dir: self.dataset_dir.clone(),
                model_dir: self.model_dir.clone(),
                log_dir: self.log_dir.clone(),
                feedback_log: self.feedback_log.clone(),
            },
            loader: self.loader.clone(),
            logging: self.logging.clone(),
        }
    }
}

fn pick<T>(cli: Option<T>, env: Option<T>, file: Option<T>) -> Option<T> {
    cli.or(env).or(file)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}='{}': {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
