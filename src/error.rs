//! Custom error types for baton.
//!
//! Only configuration and malformed-state errors ever abort a run. Worker
//! failures are absorbed by the orchestration loop and never surface here,
//! except when the worker cannot be launched at all.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for baton operations
#[derive(Error, Debug)]
pub enum BatonError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Missing required file
    #[error("Missing required file: {path}")]
    MissingFile { path: PathBuf },

    /// Missing required tool
    #[error("Missing required tool: {tool}")]
    MissingTool { tool: String },

    /// Another orchestrator holds the state directory
    #[error("State directory is locked by another orchestrator: {path}")]
    Locked { path: PathBuf },

    // =========================================================================
    // Malformed State Errors
    // =========================================================================
    /// Backlog file exists but cannot be used
    #[error("Malformed backlog {path}: {reason}")]
    MalformedBacklog { path: PathBuf, reason: String },

    /// Handoff record failed validation
    #[error("Invalid handoff record: {reason}")]
    InvalidHandoff { reason: String },

    // =========================================================================
    // Worker Errors
    // =========================================================================
    /// The worker process could not be started or fed its payload
    #[error("Failed to launch worker '{program}': {message}")]
    WorkerSpawn { program: String, message: String },

    // =========================================================================
    // Archive Errors
    // =========================================================================
    /// Archive operation failed
    #[error("Archive error: {message}")]
    Archive { message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BatonError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create a malformed backlog error
    pub fn malformed_backlog(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::MalformedBacklog {
            path,
            reason: reason.into(),
        }
    }

    /// Create a worker launch error
    pub fn worker_spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WorkerSpawn {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create an archive error
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Check if this error aborts the run.
    ///
    /// Everything that reaches the caller of the orchestrator is fatal; this
    /// separates the configuration class from malformed state for reporting.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::MissingFile { .. }
                | Self::MissingTool { .. }
                | Self::Locked { .. }
        )
    }

    /// Check if this error comes from unreadable persisted state
    pub fn is_malformed_state(&self) -> bool {
        matches!(
            self,
            Self::MalformedBacklog { .. } | Self::InvalidHandoff { .. }
        )
    }

    /// Short label for the error class, used in the final error line.
    pub fn category(&self) -> &'static str {
        if self.is_configuration() {
            "configuration error"
        } else if self.is_malformed_state() {
            "malformed state"
        } else {
            "runtime error"
        }
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Type alias for baton results
pub type Result<T> = std::result::Result<T, BatonError>;

/// Extension trait for converting foreign errors to BatonError
pub trait IntoBatonError<T> {
    fn into_baton_config(self) -> Result<T>;
    fn into_baton_archive(self) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoBatonError<T> for std::result::Result<T, E> {
    fn into_baton_config(self) -> Result<T> {
        self.map_err(|e| BatonError::config(e.into().to_string()))
    }

    fn into_baton_archive(self) -> Result<T> {
        self.map_err(|e| BatonError::archive(e.into().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BatonError::malformed_backlog(PathBuf::from("prd.json"), "duplicate id US-001");
        let msg = err.to_string();
        assert!(msg.contains("prd.json"));
        assert!(msg.contains("US-001"));
    }

    #[test]
    fn test_classification() {
        assert!(BatonError::config("bad").is_configuration());
        assert!(BatonError::MissingTool {
            tool: "claude".into()
        }
        .is_configuration());
        assert!(!BatonError::config("bad").is_malformed_state());
        assert!(
            BatonError::malformed_backlog(PathBuf::from("prd.json"), "x").is_malformed_state()
        );
        assert!(!BatonError::archive("x").is_configuration());
    }

    #[test]
    fn test_category() {
        assert_eq!(BatonError::config("bad").category(), "configuration error");
        assert_eq!(
            BatonError::Locked {
                path: PathBuf::from(".baton.lock")
            }
            .category(),
            "configuration error"
        );
        assert_eq!(
            BatonError::InvalidHandoff {
                reason: "x".into()
            }
            .category(),
            "malformed state"
        );
        assert_eq!(BatonError::worker_spawn("claude", "gone").category(), "runtime error");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BatonError::config("test").exit_code(), 1);
        assert_eq!(
            BatonError::MissingFile {
                path: PathBuf::from("prompt.md")
            }
            .exit_code(),
            1
        );
        assert_eq!(BatonError::worker_spawn("claude", "not found").exit_code(), 1);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/test/baton.json");
        let err = BatonError::config_with_path("failed to parse", path.clone());
        if let BatonError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_into_baton_error_trait() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        match result.into_baton_config() {
            Err(BatonError::Config { message, .. }) => assert!(message.contains("file not found")),
            other => panic!("Wrong error variant after conversion: {other:?}"),
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: BatonError = io_err.into();
        assert!(matches!(err, BatonError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
