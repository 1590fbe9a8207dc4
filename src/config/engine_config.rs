//! Engine Configuration - operator-tunable constants as TOML values
//!
//! Fallback start date, meter dead-band and sequence thresholds used to be
//! module-level literals. They live here now and are injected into the
//! engine. Each struct implements `Default` with the production values so a
//! run without a config file behaves exactly as before.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "PRODALLOC_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "prodalloc.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a reconciliation run.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$PRODALLOC_CONFIG` env var
/// 2. `./prodalloc.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Daily spine construction
    #[serde(default)]
    pub spine: SpineConfig,

    /// Allocation factor and baseline policy
    #[serde(default)]
    pub allocation: AllocationConfig,

    /// Sequence counters
    #[serde(default)]
    pub sequence: SequenceConfig,

    /// Run scheduling
    #[serde(default)]
    pub run: RunConfig,

    /// Output store
    #[serde(default)]
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PRODALLOC_CONFIG` environment variable
    /// 2. `./prodalloc.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings; they never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every value for internal consistency.
    ///
    /// Rules:
    /// - Thresholds must be finite and non-negative
    /// - Batch size must be > 0
    /// - The fallback start date must not be after the late-start warning year
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (mut errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        if self.run.write_batch_size == 0 {
            errors.push("run.write_batch_size must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Spine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpineConfig {
    /// First spine day for a well with no measurement in any feed
    #[serde(default = "default_start_date")]
    pub default_start_date: NaiveDate,

    /// Wells whose first measurement falls after this year are logged for review
    #[serde(default = "default_late_start_year")]
    pub late_start_warning_year: i32,
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2009, 1, 1).unwrap_or_default()
}
fn default_late_start_year() -> i32 { 2012 }

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            default_start_date: default_start_date(),
            late_start_warning_year: default_late_start_year(),
        }
    }
}

// ============================================================================
// Allocation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Wellhead readings at or below this are inside the meter dead-band and
    /// the gathered value is used as the baseline instead
    #[serde(default = "default_low_flow_threshold")]
    pub low_flow_threshold: f64,

    /// Factors above this appear in the ratio-exception report
    #[serde(default = "default_ratio_exception_limit")]
    pub ratio_exception_limit: f64,
}

fn default_low_flow_threshold() -> f64 { 2.0 }
fn default_ratio_exception_limit() -> f64 { 1.0 }

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            low_flow_threshold: default_low_flow_threshold(),
            ratio_exception_limit: default_ratio_exception_limit(),
        }
    }
}

// ============================================================================
// Sequence
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Effective production needed for "Day Seq UPRT" to advance
    #[serde(default = "default_uprt_threshold")]
    pub uprt_threshold: f64,
}

fn default_uprt_threshold() -> f64 { 1.0 }

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            uprt_threshold: default_uprt_threshold(),
        }
    }
}

// ============================================================================
// Run
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Fan wells out over the rayon pool (output order is unchanged)
    #[serde(default)]
    pub parallel: bool,

    /// Rows per store batch before the row-by-row fallback kicks in
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,
}

fn default_write_batch_size() -> usize { 1000 }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            write_batch_size: default_write_batch_size(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(super::defaults::DEFAULT_STORE_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
