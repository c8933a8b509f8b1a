use crate::schedule::{ScheduleError, SleepSchedule};
use crate::timeout::{parse_timeout, TimeoutError, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "travis-wait.toml";

/// Top-level configuration loaded from travis-wait.toml.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WaitConfig {
    pub supervisor: SupervisorConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Maximum runtime, same grammar as `--timeout`.
    pub timeout: String,
    /// Shell the command line is handed to as `<shell> -c <command>`.
    pub shell: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub countdown_secs: u64,
    pub report_interval_secs: u64,
}

// --- Default implementations ---

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT.to_string(),
            shell: "sh".to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 10,
            report_interval_secs: 60,
        }
    }
}

/// Errors loading or validating the config file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// `supervisor.timeout` does not parse.
    Timeout { source: TimeoutError },
    /// `[schedule]` values are unusable.
    Schedule { source: ScheduleError },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            ConfigError::Timeout { source } => write!(f, "supervisor.timeout: {}", source),
            ConfigError::Schedule { source } => write!(f, "schedule: {}", source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Timeout { source } => Some(source),
            ConfigError::Schedule { source } => Some(source),
        }
    }
}

impl WaitConfig {
    /// Load the config.
    ///
    /// With an explicit path the file must exist. Without one,
    /// [`DEFAULT_CONFIG_FILE`] in `dir` is used if present, else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = dir.join(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            source: e,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// The configured timeout, parsed.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_timeout(&self.supervisor.timeout).map_err(|e| ConfigError::Timeout { source: e })
    }

    /// The configured sleep schedule, validated.
    pub fn sleep_schedule(&self) -> Result<SleepSchedule, ConfigError> {
        SleepSchedule::new(
            Duration::from_secs(self.schedule.countdown_secs),
            Duration::from_secs(self.schedule.report_interval_secs),
        )
        .map_err(|e| ConfigError::Schedule { source: e })
    }
}
