//! Error types for startup validation
//!
//! Both error kinds are fatal: the watchdog refuses to start when either the
//! configuration or the remediation script is unusable. Errors that occur
//! while the monitor loop is running are never surfaced as these types; they
//! are turned into probe results or remediation outcomes instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::duration::DurationParseError;

/// Invalid value in one of the configuration variables
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A duration variable could not be parsed
    #[error("invalid {variable}: {source}")]
    InvalidDuration {
        variable: &'static str,
        #[source]
        source: DurationParseError,
    },

    /// The failure threshold is not an integer >= 1
    #[error("invalid {variable}: {value:?} is not a positive integer")]
    InvalidThreshold {
        variable: &'static str,
        value: String,
    },
}

impl ConfigError {
    /// Name of the variable holding the offending value
    pub fn variable(&self) -> &'static str {
        match self {
            ConfigError::InvalidDuration { variable, .. }
            | ConfigError::InvalidThreshold { variable, .. } => variable,
        }
    }
}

/// The remediation script cannot be deployed
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("{} is a directory, not a script", .0.display())]
    IsDirectory(PathBuf),

    #[error("could not stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not make {} executable: {source}", path.display())]
    NotExecutable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any reason for the watchdog to refuse to start
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
