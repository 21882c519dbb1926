use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run before (or instead of) touching any file.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{what} does not exist: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("copy mode requires a destination folder")]
    MissingDestination,

    #[error("no file extensions given for discovery")]
    NoExtensions,

    #[error("{operation} failed: {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid skip pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("engine setup failed")]
    Engine(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessErrorKind {
    OpenFailed,
    DetectionFailed,
    SaveFailed,
    OtherFailed,
}

impl ProcessErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenFailed => "open_failed",
            Self::DetectionFailed => "detection_failed",
            Self::SaveFailed => "save_failed",
            Self::OtherFailed => "other_failed",
        }
    }
}

impl fmt::Display for ProcessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure confined to one file. Captured into that file's outcome.
#[derive(Debug, Error)]
#[error("{kind}: {source:#}")]
pub struct ProcessError {
    pub kind: ProcessErrorKind,
    #[source]
    pub source: anyhow::Error,
}

impl ProcessError {
    pub fn new(kind: ProcessErrorKind, source: anyhow::Error) -> Self {
        Self { kind, source }
    }

    pub fn open(source: anyhow::Error) -> Self {
        Self::new(ProcessErrorKind::OpenFailed, source)
    }

    pub fn save(source: anyhow::Error) -> Self {
        Self::new(ProcessErrorKind::SaveFailed, source)
    }
}
