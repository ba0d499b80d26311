use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::trace;

use crate::duration::parse_duration;
use crate::error::{ConfigError, StartupError};
use crate::remediation::ensure_executable;

pub const PING_HOST: &str = "PING_HOST";
pub const MAX_FAILURES: &str = "MAX_FAILURES";
pub const PING_INTERVAL: &str = "PING_INTERVAL";
pub const PING_TIMEOUT: &str = "PING_TIMEOUT";
pub const RETRY_DELAY: &str = "RETRY_DELAY";
pub const CMD_WAIT_INTERVAL: &str = "CMD_WAIT_INTERVAL";

const DEFAULT_HOST: &str = "8.8.8.8";
const DEFAULT_MAX_FAILURES: &str = "10";
const DEFAULT_PING_INTERVAL: &str = "60s";
const DEFAULT_PING_TIMEOUT: &str = "3s";
const DEFAULT_RETRY_DELAY: &str = "5s";
const DEFAULT_CMD_WAIT_INTERVAL: &str = "2m";

/// Location of the remediation script, relative to the working directory
pub const DEFAULT_SCRIPT_PATH: &str = "./on-ping-fail.sh";

pub fn get_default_script_path() -> PathBuf {
    PathBuf::from(DEFAULT_SCRIPT_PATH)
}

/// Watchdog configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Host name or IP address to ping
    pub target: String,

    /// Consecutive failed pings before the script runs (always >= 1)
    pub failure_threshold: u32,

    /// Pause between pings while the target is reachable
    pub healthy_interval: Duration,

    /// How long a single ping waits for its reply
    pub probe_timeout: Duration,

    /// Pause between pings while below the failure threshold
    pub retry_delay: Duration,

    /// Pause after the remediation script ran
    pub remediation_wait: Duration,

    /// Remediation script to execute
    pub script_path: PathBuf,
}

impl MonitorConfig {
    /// Validate the remediation script, then read the environment.
    ///
    /// The script is checked first; a watchdog without a usable script is
    /// pointless no matter how it is configured.
    pub fn load(script_path: impl AsRef<Path>) -> Result<Self, StartupError> {
        Self::load_with(|key| std::env::var(key).ok(), script_path)
    }

    /// Like [`MonitorConfig::load`], reading variables through `lookup`.
    pub fn load_with<F>(lookup: F, script_path: impl AsRef<Path>) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let script_path = ensure_executable(script_path)?;
        Ok(Self::from_lookup(lookup, script_path)?)
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Unset and empty variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F, script_path: impl AsRef<Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let duration = |key: &'static str, default: &str| {
            parse_duration(&get(key, default)).map_err(|source| ConfigError::InvalidDuration {
                variable: key,
                source,
            })
        };

        let threshold = get(MAX_FAILURES, DEFAULT_MAX_FAILURES);
        let failure_threshold = threshold
            .parse::<u32>()
            .ok()
            .filter(|threshold| *threshold >= 1)
            .ok_or_else(|| ConfigError::InvalidThreshold {
                variable: MAX_FAILURES,
                value: threshold.clone(),
            })?;

        let config = MonitorConfig {
            target: get(PING_HOST, DEFAULT_HOST),
            failure_threshold,
            healthy_interval: duration(PING_INTERVAL, DEFAULT_PING_INTERVAL)?,
            probe_timeout: duration(PING_TIMEOUT, DEFAULT_PING_TIMEOUT)?,
            retry_delay: duration(RETRY_DELAY, DEFAULT_RETRY_DELAY)?,
            remediation_wait: duration(CMD_WAIT_INTERVAL, DEFAULT_CMD_WAIT_INTERVAL)?,
            script_path: script_path.as_ref().to_path_buf(),
        };

        trace!("loaded config: {config:?}");

        Ok(config)
    }
}
