// Resilience Primitives - Project Vigil
// "A watcher who falls once and stands again is still a watcher"


use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::fingerprint::Fingerprinter;
use crate::tracker::ErrorTracker;
use crate::types::{Category, ErrorContext, ErrorRecord, Severity};

/// Unqualified type name, used as the exception type of tracked failures
fn short_type_name<E>() -> &'static str {
    std::any::type_name::<E>()
        .rsplit("::")
        .next()
        .unwrap_or("Error")
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

pub type RetryCallback = Arc<dyn Fn(u32, &str) + Send + Sync>;

/// Retries an async operation with exponential backoff.
///
/// Only the calling task blocks during backoff. The exhausted failure is
/// tracked (when a tracker is attached) with `final_failure` set in the
/// context extras; intermediate failures only log.
pub struct RetryExecutor {
    name: String,
    config: RetryConfig,
    tracker: Option<Arc<ErrorTracker>>,
    on_retry: Option<RetryCallback>,
}

impl RetryExecutor {
    pub fn new<N: Into<String>>(name: N, config: RetryConfig) -> Self {
        Self {
            name: name.into(),
            config,
            tracker: None,
            on_retry: None,
        }
    }

    /// Attach a tracker that records the final, exhausted failure
    pub fn with_tracker(mut self, tracker: Arc<ErrorTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Invoked with the attempt number and error before each retry
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &str) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Retry until success or attempts are exhausted
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Retry, but propagate immediately when `retryable` rejects the error
    pub async fn execute_if<T, E, F, Fut, R>(&self, mut operation: F, retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let mut attempt: u32 = 1;
        let mut delay = self.config.delay;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(name = %self.name, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !retryable(&error) {
                        debug!(name = %self.name, error = %error, "Non-retryable failure");
                        return Err(error);
                    }
                    if attempt >= self.config.max_attempts {
                        warn!(
                            name = %self.name,
                            attempts = attempt,
                            error = %error,
                            "Retries exhausted"
                        );
                        if let Some(tracker) = &self.tracker {
                            let context = ErrorContext::new()
                                .with_function(self.name.clone())
                                .with_extra("final_failure", true)
                                .with_extra("attempts", attempt);
                            tracker
                                .track_error(
                                    &error.to_string(),
                                    short_type_name::<E>(),
                                    "",
                                    context,
                                )
                                .await;
                        }
                        return Err(error);
                    }

                    warn!(
                        name = %self.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    if let Some(callback) = &self.on_retry {
                        callback(attempt, &error.to_string());
                    }
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.config.backoff_factor);
                    attempt += 1;
                }
            }
        }
    }
}

/// Error produced by a time-limited operation
#[derive(Error, Debug)]
pub enum TimeoutError<E> {
    #[error("Operation '{operation}' timed out after {duration_ms}ms")]
    TimedOut { operation: String, duration_ms: u64 },

    #[error("Operation failed: {0}")]
    Inner(E),
}

/// Run a future under a time limit, tracking the timeout if it fires
pub async fn with_timeout<T, E, Fut>(
    operation: &str,
    limit: Duration,
    tracker: Option<&ErrorTracker>,
    future: Fut,
) -> Result<T, TimeoutError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(TimeoutError::Inner(error)),
        Err(_) => {
            let duration_ms = limit.as_millis() as u64;
            warn!(operation, duration_ms, "Operation timed out");
            if let Some(tracker) = tracker {
                tracker
                    .track_error_with(
                        &format!("Operation '{operation}' timed out after {duration_ms}ms"),
                        "TimeoutError",
                        "",
                        ErrorContext::new().with_function(operation),
                        Some(Severity::Error),
                        Some(Category::Timeout),
                    )
                    .await;
            }
            Err(TimeoutError::TimedOut {
                operation: operation.to_string(),
                duration_ms,
            })
        }
    }
}

/// Run a future, yielding the fallback value on failure
pub async fn with_fallback<T, E, Fut>(
    fallback: T,
    tracker: Option<&ErrorTracker>,
    future: Fut,
) -> T
where
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match future.await {
        Ok(value) => value,
        Err(error) => {
            debug!(error = %error, "Falling back after failure");
            if let Some(tracker) = tracker {
                tracker
                    .track_error(
                        &error.to_string(),
                        short_type_name::<E>(),
                        "",
                        ErrorContext::new(),
                    )
                    .await;
            }
            fallback
        }
    }
}

/// Contains failures of one logical region of work.
///
/// Every caught failure is collected into an inspectable list; central
/// tracking through an attached tracker is optional. The boundary then
/// either reraises the error or swallows it, yielding the configured
/// fallback.
pub struct ErrorBoundary<T> {
    name: String,
    fallback_value: Option<T>,
    reraise: bool,
    track_errors: bool,
    tracker: Option<Arc<ErrorTracker>>,
    classifier: Classifier,
    fingerprinter: Fingerprinter,
    errors: Vec<ErrorRecord>,
}

impl<T: Clone> ErrorBoundary<T> {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            fallback_value: None,
            reraise: true,
            track_errors: true,
            tracker: None,
            classifier: Classifier::new(),
            fingerprinter: Fingerprinter::new(),
            errors: Vec::new(),
        }
    }

    /// Value yielded when a swallowed failure occurs
    pub fn with_fallback(mut self, value: T) -> Self {
        self.fallback_value = Some(value);
        self
    }

    /// Whether failures propagate (true) or are swallowed (false)
    pub fn reraise(mut self, reraise: bool) -> Self {
        self.reraise = reraise;
        self
    }

    pub fn track_errors(mut self, track: bool) -> Self {
        self.track_errors = track;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<ErrorTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Run one operation inside the boundary
    pub async fn run<E, Fut>(&mut self, future: Fut) -> Result<Option<T>, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match future.await {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                warn!(boundary = %self.name, error = %error, "Error caught at boundary");
                let message = error.to_string();
                let exception_type = short_type_name::<E>();
                let context = ErrorContext::new().with_function(self.name.clone());

                // The local list gets an entry either way; the tracker is
                // only consulted for central aggregation
                let record = match &self.tracker {
                    Some(tracker) if self.track_errors => {
                        tracker
                            .track_error(&message, exception_type, "", context)
                            .await
                    }
                    _ => {
                        let severity = self
                            .classifier
                            .determine_severity(exception_type, &message);
                        let category =
                            self.classifier.classify(&message, exception_type, "");
                        let fingerprint =
                            self.fingerprinter
                                .fingerprint(&message, exception_type, "", &context);
                        ErrorRecord::new(
                            severity,
                            category,
                            message,
                            exception_type,
                            "",
                            context,
                            fingerprint,
                        )
                    }
                };
                self.errors.push(record);

                if self.reraise {
                    Err(error)
                } else {
                    Ok(self.fallback_value.clone())
                }
            }
        }
    }

    /// Records collected from failed runs, oldest first
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

/// Run an operation with bounded retries and a guaranteed fallback.
///
/// Every failed attempt is tracked under `{function_name}#attempt-{n}`;
/// the delay grows linearly with the attempt number. Never fails: when
/// all attempts are spent the fallback value is returned.
pub async fn safe_execute<T, E, F, Fut>(
    tracker: &ErrorTracker,
    function_name: &str,
    fallback: T,
    retry_count: u32,
    base_delay: Duration,
    mut operation: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    for attempt in 0..=retry_count {
        match operation().await {
            Ok(value) => return value,
            Err(error) => {
                let context = ErrorContext::new()
                    .with_function(format!("{function_name}#attempt-{attempt}"));
                tracker
                    .track_error(&error.to_string(), short_type_name::<E>(), "", context)
                    .await;

                if attempt < retry_count {
                    tokio::time::sleep(base_delay * (attempt + 1)).await;
                }
            }
        }
    }

    warn!(function_name, "All attempts failed, using fallback");
    fallback
}
