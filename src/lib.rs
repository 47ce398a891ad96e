// Project Vigil - Core Library
// "The watch takes note of every failure"

pub mod alerting;
pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod resilience;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use alerting::{Alert, AlertLevel, AlertManager, AlertRule, MetricPoint};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerRegistry, CircuitState,
};
pub use crate::config::Settings;
pub use error::{VigilError, VigilResult};
pub use logging::{init_logging, LoggingConfig};
pub use resilience::{safe_execute, with_fallback, with_timeout, ErrorBoundary, RetryExecutor};
pub use tracker::{ErrorTracker, TrackerConfig};
pub use types::{Category, ErrorContext, ErrorRecord, ErrorStats, Severity};
