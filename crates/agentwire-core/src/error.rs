//! Error types for agent installation.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, InstallError>;

/// Failures an installation strategy can report.
///
/// Detection never produces one of these: probes that cannot run are
/// reported as "not detected".
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed: {stderr}")]
    Process { command: String, stderr: String },

    #[error("Command `{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{agent} does not support {operation}")]
    Unsupported { agent: String, operation: String },

    #[error("Invalid server entry '{key}': {message}")]
    InvalidEntry { key: String, message: String },
}

impl InstallError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        InstallError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Read {
            path: path.into(),
            source,
        }
    }
}

/// Boundary result of an installation call.
///
/// Callers inspect `success`; `message` carries the diagnostic of a failure
/// or the note attached to a success (e.g. an entry that already existed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl InstallOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl From<Result<Option<String>>> for InstallOutcome {
    fn from(result: Result<Option<String>>) -> Self {
        match result {
            Ok(None) => InstallOutcome::ok(),
            Ok(Some(note)) => InstallOutcome::ok_with(note),
            Err(err) => InstallOutcome::failed(err.to_string()),
        }
    }
}
