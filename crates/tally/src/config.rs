//! Runtime configuration.
//!
//! Loaded from a TOML file with environment-variable overrides for the
//! paths. Priority: environment variables > config file > defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// The interpreter error log to digest.
    pub log_path: PathBuf,
    /// Where to persist the resumable cursor; `None` disables caching and
    /// every run re-scans the whole file.
    pub cache_path: Option<PathBuf>,
    pub trace_header_policy: TraceHeaderPolicy,
    pub on_truncation: TruncationPolicy,
    /// Lines per source excerpt attached to new records.
    pub excerpt_lines: usize,
}

/// What to do with a header line that itself ends in "Stack trace:". It
/// always triggers trace collection; whether it is *also* counted as an
/// occurrence of its own is a policy choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceHeaderPolicy {
    /// Count it as a record (announcement text stripped from the message).
    #[default]
    Count,
    /// Treat it purely as a trigger, never counted.
    Skip,
}

/// What to do when the log file is shorter than the cached offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Treat it as rotation: drop the cache and re-scan from offset 0.
    #[default]
    Reset,
    /// Surface an error and leave the cache untouched.
    Fail,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("/var/log/php_errors.log"),
            cache_path: None,
            trace_header_policy: TraceHeaderPolicy::default(),
            on_truncation: TruncationPolicy::default(),
            excerpt_lines: crate::DEFAULT_EXCERPT_LINES,
        }
    }
}

impl TallyConfig {
    /// Load configuration from file or environment variables.
    /// Priority: environment variables > config file > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("TALLY_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/phptally/tally.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!(path = %config_path, "loading configuration file");
            Self::from_file(Path::new(&config_path))?
        } else {
            tracing::info!(path = %config_path, "config file not found, using defaults");
            Self::default()
        };

        if let Ok(path) = std::env::var("TALLY_LOG_PATH") {
            config.log_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TALLY_CACHE_PATH") {
            config.cache_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
