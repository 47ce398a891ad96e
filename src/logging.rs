// Structured Logging Configuration - Project Vigil
// "A watch that keeps no record keeps no watch at all"

use crate::error::{VigilError, VigilResult};
use serde::{Deserialize, Serialize};
use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: String,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to include target module names
    pub include_targets: bool,
    /// Whether to include file and line numbers
    pub include_file_line: bool,
    /// Span events to include (new, enter, exit, close, active, full)
    pub span_events: String,
    /// Whether to enable ANSI colors in output
    pub enable_colors: bool,
    /// Log file path (optional, logs to stdout if not specified)
    pub file_path: Option<String>,
    /// Environment filter override
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            include_thread_ids: true,
            include_targets: false,
            include_file_line: false,
            span_events: "new,close".to_string(),
            enable_colors: true,
            file_path: None,
            env_filter: None,
        }
    }
}

/// Logging format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(VigilError::configuration(format!(
                "Invalid log format: {s}. Valid options: json, pretty, compact"
            ))),
        }
    }
}

/// Span events configuration
#[derive(Debug, Clone)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
    pub active: bool,
    pub full: bool,
}

impl SpanEvents {
    pub fn from_string(s: &str) -> Self {
        let events: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            new: events.contains(&"new".to_string()) || events.contains(&"full".to_string()),
            enter: events.contains(&"enter".to_string()) || events.contains(&"full".to_string()),
            exit: events.contains(&"exit".to_string()) || events.contains(&"full".to_string()),
            close: events.contains(&"close".to_string()) || events.contains(&"full".to_string()),
            active: events.contains(&"active".to_string()) || events.contains(&"full".to_string()),
            full: events.contains(&"full".to_string()),
        }
    }

    pub fn to_fmt_span(&self) -> FmtSpan {
        let mut span = FmtSpan::NONE;

        if self.new {
            span |= FmtSpan::NEW;
        }
        if self.enter {
            span |= FmtSpan::ENTER;
        }
        if self.exit {
            span |= FmtSpan::EXIT;
        }
        if self.close {
            span |= FmtSpan::CLOSE;
        }
        if self.active {
            span |= FmtSpan::ACTIVE;
        }
        if self.full {
            FmtSpan::FULL
        } else {
            span
        }
    }
}

/// Initialize logging with the given configuration
pub fn init_logging(config: &LoggingConfig) -> VigilResult<()> {
    let level = config.level.parse::<Level>().map_err(|_| {
        VigilError::configuration(format!("Invalid log level: {}", config.level))
    })?;

    let format = config.format.parse::<LogFormat>()?;

    let env_filter = if let Some(ref filter) = config.env_filter {
        EnvFilter::try_new(filter)
            .map_err(|e| VigilError::configuration(format!("Invalid env filter: {e}")))?
    } else {
        let directive = format!("vigil={level}")
            .parse()
            .map_err(|e| VigilError::configuration(format!("Invalid level directive: {e}")))?;
        EnvFilter::from_default_env().add_directive(directive)
    };

    let span_events = SpanEvents::from_string(&config.span_events);
    let subscriber = Registry::default().with(env_filter);

    let result = match format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_file(config.include_file_line)
                .with_line_number(config.include_file_line)
                .with_span_events(span_events.to_fmt_span());

            match open_log_file(config)? {
                Some(file) => subscriber.with(layer.with_writer(file)).try_init(),
                None => subscriber.with(layer.with_writer(io::stdout)).try_init(),
            }
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_file(config.include_file_line)
                .with_line_number(config.include_file_line)
                .with_span_events(span_events.to_fmt_span())
                .with_ansi(config.enable_colors);

            match open_log_file(config)? {
                Some(file) => subscriber.with(layer.with_writer(file)).try_init(),
                None => subscriber.with(layer.with_writer(io::stdout)).try_init(),
            }
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_file(config.include_file_line)
                .with_line_number(config.include_file_line)
                .with_span_events(span_events.to_fmt_span())
                .with_ansi(config.enable_colors);

            match open_log_file(config)? {
                Some(file) => subscriber.with(layer.with_writer(file)).try_init(),
                None => subscriber.with(layer.with_writer(io::stdout)).try_init(),
            }
        }
    };
    result.map_err(|e| VigilError::configuration(format!("Failed to set subscriber: {e}")))?;

    tracing::info!(
        "⚬ Logging initialized with level: {}, format: {}",
        config.level,
        config.format
    );

    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> VigilResult<Option<std::fs::File>> {
    let Some(ref file_path) = config.file_path else {
        return Ok(None);
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|e| VigilError::configuration(format!("Failed to open log file: {e}")))?;
    Ok(Some(file))
}

/// Log a core error at the level its severity dictates
pub fn log_error_with_context(error: &VigilError, context: &str) {
    match error.severity() {
        Level::ERROR => tracing::error!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
        Level::WARN => tracing::warn!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
        Level::INFO => tracing::info!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
        Level::DEBUG => tracing::debug!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
        Level::TRACE => tracing::trace!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
    }
}
