//! Running the remediation script
//!
//! The script is validated once at startup with [`ensure_executable`] and
//! then executed by a [`Remediator`] every time the failure threshold is
//! reached.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ScriptError;

/// Result of a single remediation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// The script ran and exited with status 0
    Succeeded,

    /// The script ran but exited unsuccessfully (non-zero status or signal)
    Failed { error: String },

    /// The script could not be started at all
    LaunchFailed { error: String },
}

impl RemediationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, RemediationOutcome::Succeeded)
    }

    /// Whether the script actually ran, regardless of its exit status
    pub fn launched(&self) -> bool {
        !matches!(self, RemediationOutcome::LaunchFailed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RemediationOutcome::Succeeded => None,
            RemediationOutcome::Failed { error } | RemediationOutcome::LaunchFailed { error } => {
                Some(error)
            }
        }
    }
}

/// Corrective action triggered by sustained probe failures
#[async_trait]
pub trait Remediator: Send + Sync {
    /// Run the action to completion.
    async fn remediate(&self) -> RemediationOutcome;
}

/// Check that `path` is a runnable script, adding execute bits if needed.
///
/// The returned path is the one that should be executed: relative paths are
/// anchored at the working directory so they are never looked up in `PATH`.
pub fn ensure_executable(path: impl AsRef<Path>) -> Result<PathBuf, ScriptError> {
    let path = path.as_ref();

    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ScriptError::Missing(path.to_path_buf()),
        _ => ScriptError::Stat {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if metadata.is_dir() {
        return Err(ScriptError::IsDirectory(path.to_path_buf()));
    }

    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o111 == 0 {
        debug!("{} is not executable, adding +x", path.display());
        permissions.set_mode(mode | 0o111);
        fs::set_permissions(path, permissions).map_err(|source| ScriptError::NotExecutable {
            path: path.to_path_buf(),
            source,
        })?;
    }

    if path.is_relative() && !path.starts_with(".") {
        Ok(Path::new(".").join(path))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Remediator executing a script without arguments
///
/// The script inherits stdout and stderr so its output shows up alongside
/// the watchdog's own log lines. Each call waits for the child to exit.
#[derive(Debug, Clone)]
pub struct ScriptRemediator {
    path: PathBuf,
}

impl ScriptRemediator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Remediator for ScriptRemediator {
    #[instrument(skip(self), fields(script = %self.path.display()))]
    async fn remediate(&self) -> RemediationOutcome {
        let status = Command::new(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {
                debug!("script finished successfully");
                RemediationOutcome::Succeeded
            }
            Ok(status) => {
                warn!("script exited unsuccessfully: {status}");
                RemediationOutcome::Failed {
                    error: format!("script exited with {status}"),
                }
            }
            Err(e) => RemediationOutcome::LaunchFailed {
                error: format!("running script: {e}"),
            },
        }
    }
}
