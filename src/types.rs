// Shared Types - Project Vigil
// "Every failure has a name, a time, and a count"

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Ordinal urgency classification of a tracked error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taxonomy bucket describing the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Authentication,
    Authorization,
    Validation,
    ApiError,
    NetworkError,
    FileIo,
    ParsingError,
    MemoryError,
    Timeout,
    Configuration,
    Dependency,
    BusinessLogic,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::ApiError => "api_error",
            Self::NetworkError => "network_error",
            Self::FileIo => "file_io",
            Self::ParsingError => "parsing_error",
            Self::MemoryError => "memory_error",
            Self::Timeout => "timeout",
            Self::Configuration => "configuration",
            Self::Dependency => "dependency",
            Self::BusinessLogic => "business_logic",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context information attached to an error occurrence.
///
/// Immutable once attached to a record; built with the `with_*` methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    pub function_name: Option<String>,
    pub module_name: Option<String>,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function<S: Into<String>>(mut self, function_name: S) -> Self {
        self.function_name = Some(function_name.into());
        self
    }

    pub fn with_module<S: Into<String>>(mut self, module_name: S) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    pub fn with_file<S: Into<String>>(mut self, file_path: S) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_line(mut self, line_number: u32) -> Self {
        self.line_number = Some(line_number);
        self
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_extra<K: Into<String>, V: Into<serde_json::Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Canonical record for one class of logically-identical errors.
///
/// Exactly one record exists per fingerprint in the store; `count` equals the
/// number of tracked occurrences with that fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub exception_type: String,
    pub stack_trace: String,
    pub context: ErrorContext,
    pub fingerprint: String,
    pub count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub resolved: bool,
    pub resolution_notes: Option<String>,
}

impl ErrorRecord {
    /// Create a record for the first occurrence of a fingerprint
    pub fn new<M, T, S>(
        severity: Severity,
        category: Category,
        message: M,
        exception_type: T,
        stack_trace: S,
        context: ErrorContext,
        fingerprint: String,
    ) -> Self
    where
        M: Into<String>,
        T: Into<String>,
        S: Into<String>,
    {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            severity,
            category,
            message: message.into(),
            exception_type: exception_type.into(),
            stack_trace: stack_trace.into(),
            context,
            fingerprint,
            count: 1,
            first_seen: now,
            last_seen: now,
            resolved: false,
            resolution_notes: None,
        }
    }
}

/// Summary entry for a high-frequency error in `ErrorStats::top_errors`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopErrorEntry {
    pub fingerprint: String,
    pub message: String,
    pub count: u64,
    pub severity: Severity,
    pub category: Category,
    pub last_seen: DateTime<Utc>,
}

/// Derived, read-only error statistics snapshot.
///
/// Recomputed wholesale on each stats tick, never patched incrementally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorStats {
    pub total_errors: u64,
    /// Occurrences in the trailing hour divided by 3600 (errors per second)
    pub error_rate: f64,
    pub errors_by_severity: HashMap<String, u64>,
    pub errors_by_category: HashMap<String, u64>,
    pub top_errors: Vec<TopErrorEntry>,
    pub resolution_rate: f64,
    /// Mean of `last_seen - first_seen` in seconds over resolved records
    /// with non-empty resolution notes
    pub mean_time_to_resolution: f64,
}

/// Per-day rollup of error counts over a historical window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendEntry {
    pub date: String,
    pub total_errors: u64,
    pub critical_errors: u64,
    /// Occurrences that day divided by 86400 (errors per second)
    pub error_rate: f64,
    /// Most frequent category that day, or "none"
    pub top_category: String,
}
