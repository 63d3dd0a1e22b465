//! Error types for the proxy executor
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Error context and chaining
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::executor::ExecutorShutdown;

/// Result type alias for dispatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by errors that wrap a foreign failure
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    UnknownExecutorKind = 103,

    // IO and path errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    PathOutsideRoot = 204,

    // Serialization errors (4xx)
    SerializationFailed = 400,

    // Execution errors (5xx)
    ExecutorNotStarted = 500,
    ExecutorShutdown = 501,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            400..=499 => 40, // Serialization errors
            500..=599 => 50, // Execution errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the dispatch facade and its helpers
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Executor kind string not present in the alias table
    #[error("Unknown executor string '{kind}' accepted values are {accepted:?}")]
    UnknownExecutorKind {
        kind: String,
        accepted: Vec<&'static str>,
    },

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// Submission attempted while the proxy is not started
    #[error("{driver} driver asynchronous executor has not been started")]
    NotStarted { driver: String },

    /// The underlying executor refused the job because it was shut down
    #[error("{driver} driver asynchronous executor has been shutdown")]
    ExecutorShutdown {
        driver: String,
        #[source]
        source: ExecutorShutdown,
    },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// Joined path escaped its root directory
    #[error("Unable to create path that is outside of parent directory '{}' using segments {pieces:?}", .root.display())]
    PathOutsideRoot { root: PathBuf, pieces: Vec<String> },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Serialization Errors
    // ─────────────────────────────────────────────────────────────

    /// MessagePack encode or decode failure
    #[error("Serialization failed: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,
            Error::UnknownExecutorKind { .. } => ErrorCode::UnknownExecutorKind,

            Error::NotStarted { .. } => ErrorCode::ExecutorNotStarted,
            Error::ExecutorShutdown { .. } => ErrorCode::ExecutorShutdown,

            Error::PathOutsideRoot { .. } => ErrorCode::PathOutsideRoot,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::SerializationFailed,

            Error::Serialization { .. } => ErrorCode::SerializationFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is raised once at configuration time rather than per call
    pub fn is_configuration(&self) -> bool {
        (100..200).contains(&(self.code() as u16))
    }

    /// Check if the error is fatal (the process should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::UnknownExecutorKind { .. }
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'proxy-executor config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'proxy-executor config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::UnknownExecutorKind { .. } => Some(
                "Run 'proxy-executor kinds' to list the accepted executor names."
            ),
            Error::NotStarted { .. } => Some(
                "Call start() on the executor before submitting work."
            ),
            Error::ExecutorShutdown { .. } => Some(
                "The underlying executor was shut down. Restart the driver or supply a live executor."
            ),
            Error::PathOutsideRoot { .. } => Some(
                "Use a relative path that stays inside the data directory."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not-started error for a driver
    pub fn not_started(driver: impl Into<String>) -> Self {
        Error::NotStarted {
            driver: driver.into(),
        }
    }

    /// Normalize an executor rejection for a driver
    pub fn executor_shutdown(driver: impl Into<String>, source: ExecutorShutdown) -> Self {
        Error::ExecutorShutdown {
            driver: driver.into(),
            source,
        }
    }

    /// Wrap a foreign failure as a serialization error, keeping it as the cause
    pub fn serialization<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Serialization {
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
