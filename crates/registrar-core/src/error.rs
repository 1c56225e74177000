//! Error types for Registrar

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using Registrar's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Registrar error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Filesystem errors (E001-E099)
    #[error("Partition root '{}' not found. Check `access.data_root` with `registrar config get access.data_root`.", .0.display())]
    PartitionRootNotFound(PathBuf),

    #[error("Permission denied while reading '{}'.", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Partition root '{}' is not a directory.", .0.display())]
    NotADirectory(PathBuf),

    // Extraction errors (E100-E199)
    #[error("Invalid extraction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Name model could not be loaded from '{}': {}", .0.display(), .1)]
    ModelLoadFailed(PathBuf, String),

    // Plan errors (E200-E299)
    #[error("Invalid query plan: {0}. A plan must be a JSON object.")]
    InvalidPlan(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Runtime errors (E900-E999)
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map an I/O error raised while reading `path` onto a distinct error kind
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::PartitionRootNotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Io(err),
        }
    }

    /// Whether this error means the requested data does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::PartitionRootNotFound(_) => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::PartitionRootNotFound(_) => "E001",
            Self::PermissionDenied(_) => "E002",
            Self::NotADirectory(_) => "E003",
            Self::InvalidPattern(_) => "E100",
            Self::ModelLoadFailed(..) => "E101",
            Self::InvalidPlan(_) => "E200",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::TaskFailed(_) => "E900",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::PartitionRootNotFound(_) | Self::NotADirectory(_) => {
                Some("registrar config set access.data_root <dir>".to_string())
            }
            Self::ModelLoadFailed(..) => Some("registrar config get delex.name_model_path".to_string()),
            Self::InvalidPlan(_) => Some(r#"Pass the plan as a JSON object, e.g. '{"program": "Nursing"}'"#.to_string()),
            Self::InvalidInput(_) => Some("Pass an authenticated role, e.g. --role faculty".to_string()),
            _ => None,
        }
    }
}
