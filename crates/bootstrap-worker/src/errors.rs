// Error taxonomy for provisioning steps.

use std::path::PathBuf;
use std::time::Duration;

/// Why a step's action failed. Every variant is terminal for the run unless
/// the step is best-effort.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("dependency '{package}' could not be installed: {reason}")]
    DependencyInstall {
        package: String,
        reason: String,
        guidance: Option<String>,
    },

    #[error("failed to fetch '{source_url}': {reason}")]
    Fetch { source_url: String, reason: String },

    #[error("authentication failed while cloning '{source_url}'")]
    AuthFetch { source_url: String, guidance: String },

    #[error("build failed in '{}': {reason}", working_dir.display())]
    Build { working_dir: PathBuf, reason: String },

    #[error("could not displace '{}': {reason}", path.display())]
    Displace { path: PathBuf, reason: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

impl ProvisionError {
    /// Actionable advice for the user, when there is any.
    pub fn remediation(&self) -> Option<&str> {
        match self {
            ProvisionError::AuthFetch { guidance, .. } => Some(guidance),
            ProvisionError::DependencyInstall { guidance, .. } => guidance.as_deref(),
            _ => None,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvisionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A failed step: the step's name plus the underlying error.
#[derive(Debug, thiserror::Error)]
#[error("step '{step}' failed: {error}")]
pub struct StepFailure {
    pub step: String,
    #[source]
    pub error: ProvisionError,
}
