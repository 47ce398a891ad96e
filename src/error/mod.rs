// Error Handling Module - Project Vigil
// "The watch must know its own failures first"

use std::fmt;
use thiserror::Error;

/// Error types for the tracking core itself.
///
/// Failures of tracked application operations are represented by
/// `ErrorRecord`s; this enum covers faults of the core's own surface
/// (export, configuration, circuit breaking, timeouts).
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Unsupported export format: {format}")]
    UnsupportedExportFormat { format: String },

    #[error("Export failed: {message}")]
    ExportIo { message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Circuit breaker is open: {message}")]
    CircuitBreakerOpen { message: String },

    #[error("Timeout occurred: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Tracking failed: {message}")]
    TrackingFailed { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VigilError {
    /// Create an unsupported export format error
    pub fn unsupported_export_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedExportFormat {
            format: format.into(),
        }
    }

    /// Create an export I/O error
    pub fn export_io<S: Into<String>>(message: S) -> Self {
        Self::ExportIo {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a circuit breaker open error
    pub fn circuit_breaker_open<S: Into<String>>(message: S) -> Self {
        Self::CircuitBreakerOpen {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Create a tracking failure error
    pub fn tracking_failed<S: Into<String>>(message: S) -> Self {
        Self::TrackingFailed {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedExportFormat { .. }
            | Self::ExportIo { .. }
            | Self::Serialization { .. } => "export",
            Self::Configuration { .. } => "configuration",
            Self::CircuitBreakerOpen { .. } => "circuit_breaker",
            Self::Timeout { .. } => "system",
            Self::TrackingFailed { .. } => "tracking",
            Self::Internal { .. } => "general",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ExportIo { .. } | Self::Timeout { .. } => true,

            Self::UnsupportedExportFormat { .. }
            | Self::Serialization { .. }
            | Self::Configuration { .. }
            | Self::CircuitBreakerOpen { .. }
            | Self::TrackingFailed { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// Get severity level for logging
    pub fn severity(&self) -> tracing::Level {
        match self {
            Self::CircuitBreakerOpen { .. } => tracing::Level::ERROR,

            Self::ExportIo { .. } | Self::Timeout { .. } | Self::TrackingFailed { .. } => {
                tracing::Level::WARN
            }

            Self::UnsupportedExportFormat { .. }
            | Self::Serialization { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => tracing::Level::DEBUG,
        }
    }
}

/// Convert anyhow::Error to VigilError
impl From<anyhow::Error> for VigilError {
    fn from(error: anyhow::Error) -> Self {
        VigilError::internal(error.to_string())
    }
}

/// Convert std::io::Error to VigilError
impl From<std::io::Error> for VigilError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut => VigilError::timeout("io operation", 0),
            _ => VigilError::export_io(error.to_string()),
        }
    }
}

/// Convert serde_json::Error to VigilError
impl From<serde_json::Error> for VigilError {
    fn from(error: serde_json::Error) -> Self {
        VigilError::serialization(error.to_string())
    }
}

/// Result type alias for convenience
pub type VigilResult<T> = Result<T, VigilError>;

/// Extension trait for adding context to foreign results
pub trait ResultExt<T> {
    fn with_context<F>(self, f: F) -> VigilResult<T>
    where
        F: FnOnce() -> String;

    fn with_export_context(self) -> VigilResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: fmt::Display,
{
    fn with_context<F>(self, f: F) -> VigilResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| VigilError::internal(format!("{}: {}", f(), e)))
    }

    fn with_export_context(self) -> VigilResult<T> {
        self.map_err(|e| VigilError::export_io(e.to_string()))
    }
}
