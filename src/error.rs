use thiserror::Error;
use tracing::warn;

/// Error severity for host display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational
    Warning,  // recoverable
    Error,    // operation failed
}

/// Domain-specific errors for the script dock
#[derive(Error, Debug)]
pub enum DockError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Unsupported file type: {path}")]
    UnsupportedFileType { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DockError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Storage(_) => ErrorSeverity::Error,
            Self::InvalidCommand(_) => ErrorSeverity::Warning,
            Self::UnsupportedFileType { .. } => ErrorSeverity::Warning,
            Self::Io(_) => ErrorSeverity::Error,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(msg) => format!("Could not persist dock state: {}", msg),
            Self::InvalidCommand(msg) => msg.clone(),
            Self::UnsupportedFileType { path } => {
                format!("No registered script type matches {}", path)
            }
            Self::Io(e) => format!("File system issue: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, DockError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
pub trait ResultExt<T> {
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
