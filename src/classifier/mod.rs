// Error Classifier - Project Vigil
// "Name the enemy before you fight it"


use crate::types::{Category, Severity};

/// Ordered classification rule table.
///
/// Iterated in declaration order; on a tied keyword score the
/// first-declared category wins. BusinessLogic carries no keywords and is
/// only reachable via an explicit category override.
const CLASSIFICATION_RULES: &[(Category, &[&str])] = &[
    (
        Category::Authentication,
        &["authentication", "auth", "login", "credential", "unauthorized", "401"],
    ),
    (
        Category::Authorization,
        &["authorization", "permission", "access denied", "forbidden", "403"],
    ),
    (
        Category::Validation,
        &["validation", "invalid", "schema", "format", "constraint", "400"],
    ),
    (
        Category::ApiError,
        &["api", "http", "rest", "endpoint", "service", "502", "503", "504"],
    ),
    (
        Category::NetworkError,
        &["network", "connection", "timeout", "dns", "socket", "unreachable"],
    ),
    (
        Category::FileIo,
        &["file", "io", "read", "write", "permission", "not found", "disk"],
    ),
    (
        Category::ParsingError,
        &["parse", "json", "xml", "csv", "format", "decode", "encode"],
    ),
    (
        Category::MemoryError,
        &["memory", "out of memory", "allocation", "heap", "oom"],
    ),
    (
        Category::Timeout,
        &["timeout", "deadline", "expired", "time limit"],
    ),
    (
        Category::Configuration,
        &["config", "setting", "parameter", "env", "missing"],
    ),
    (
        Category::Dependency,
        &["import", "module", "package", "dependency", "version"],
    ),
];

/// Exception-type keywords that indicate a system-level critical failure
const CRITICAL_TYPE_KEYWORDS: &[&str] = &[
    "systemerror",
    "memoryerror",
    "outofmemory",
    "keyboardinterrupt",
    "systemexit",
];

/// Message keywords that indicate a fatal condition
const FATAL_MESSAGE_KEYWORDS: &[&str] = &["fatal", "critical", "emergency", "system failure"];

/// Classifies errors into categories and severities from keyword heuristics
#[derive(Debug, Clone, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an error into a category based on message, exception type,
    /// and stack trace. Returns `Category::Unknown` when no keyword matches.
    pub fn classify(&self, message: &str, exception_type: &str, stack_trace: &str) -> Category {
        let text = format!("{message} {exception_type} {stack_trace}").to_lowercase();

        let mut best = Category::Unknown;
        let mut best_score = 0usize;
        for (category, keywords) in CLASSIFICATION_RULES {
            let score = keywords.iter().filter(|k| text.contains(*k)).count();
            // Strict comparison keeps the first-declared category on ties
            if score > best_score {
                best = *category;
                best_score = score;
            }
        }

        best
    }

    /// Determine severity from exception type and message using an ordered
    /// heuristic; defaults to `Severity::Error`.
    pub fn determine_severity(&self, exception_type: &str, message: &str) -> Severity {
        let type_lower = exception_type.to_lowercase();
        let message_lower = message.to_lowercase();

        if CRITICAL_TYPE_KEYWORDS.iter().any(|k| type_lower.contains(k)) {
            return Severity::Critical;
        }

        if FATAL_MESSAGE_KEYWORDS.iter().any(|k| message_lower.contains(k)) {
            return Severity::Fatal;
        }

        if ["error", "exception", "failure"]
            .iter()
            .any(|k| type_lower.contains(k))
        {
            return Severity::Error;
        }

        if ["warning", "deprecation"].iter().any(|k| type_lower.contains(k)) {
            return Severity::Warning;
        }

        Severity::Error
    }
}
