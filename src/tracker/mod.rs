// Error Tracker - Project Vigil
// "The watch takes note of every failure"

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::alerting::{Alert, AlertManager, AlertSummary, AlertingConfig, MetricPoint};
use crate::classifier::Classifier;
use crate::error::{ResultExt, VigilError, VigilResult};
use crate::fingerprint::Fingerprinter;
use crate::stats::{StatsConfig, StatsEngine};
use crate::store::{ErrorStore, StoreConfig};
use crate::types::{Category, ErrorContext, ErrorRecord, ErrorStats, Severity, TrendEntry};
use uuid::Uuid;

/// Spike detection looks at this many minutes of occurrence history
const SPIKE_WINDOW_MINUTES: i64 = 10;

/// Tracker configuration, aggregating the per-component configs
#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    pub store: StoreConfig,
    pub stats: StatsConfig,
    pub alerting: AlertingConfig,
    /// Stack frame path markers that identify application code;
    /// None keeps the built-in defaults
    pub app_path_markers: Option<Vec<String>>,
}

/// Central error tracking facade.
///
/// Classifies, fingerprints, and aggregates error occurrences, feeds the
/// alerting rules, and owns the background stats engine.
pub struct ErrorTracker {
    classifier: Classifier,
    fingerprinter: Fingerprinter,
    store: Arc<ErrorStore>,
    stats: Arc<StatsEngine>,
    alerts: Arc<AlertManager>,
}

impl ErrorTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let fingerprinter = match config.app_path_markers {
            Some(markers) => Fingerprinter::with_markers(markers),
            None => Fingerprinter::new(),
        };
        let store = Arc::new(ErrorStore::new(config.store));
        let stats = Arc::new(StatsEngine::new(Arc::clone(&store), config.stats));
        let alerts = Arc::new(AlertManager::new(config.alerting));
        Self {
            classifier: Classifier::new(),
            fingerprinter,
            store,
            stats,
            alerts,
        }
    }

    /// Start background processing (stats refresh loop)
    pub async fn start(&self) {
        self.stats.start().await;
        info!("🛰️ Error tracker started");
    }

    /// Stop background processing
    pub async fn shutdown(&self) {
        self.stats.stop().await;
        info!("Error tracker stopped");
    }

    /// Track one error occurrence, deriving severity and category
    pub async fn track_error(
        &self,
        message: &str,
        exception_type: &str,
        stack_trace: &str,
        context: ErrorContext,
    ) -> ErrorRecord {
        self.track_error_with(message, exception_type, stack_trace, context, None, None)
            .await
    }

    /// Track one error occurrence with optional severity/category overrides
    pub async fn track_error_with(
        &self,
        message: &str,
        exception_type: &str,
        stack_trace: &str,
        context: ErrorContext,
        severity: Option<Severity>,
        category: Option<Category>,
    ) -> ErrorRecord {
        let severity = severity
            .unwrap_or_else(|| self.classifier.determine_severity(exception_type, message));
        let category = category
            .unwrap_or_else(|| self.classifier.classify(message, exception_type, stack_trace));
        let fingerprint = self
            .fingerprinter
            .fingerprint(message, exception_type, stack_trace, &context);

        let candidate = ErrorRecord::new(
            severity,
            category,
            message,
            exception_type,
            stack_trace,
            context,
            fingerprint,
        );
        let record = self.store.add(candidate).await;

        let cutoff = Utc::now() - chrono::Duration::minutes(SPIKE_WINDOW_MINUTES);
        let recent = self.store.occurrences_since(cutoff).await;
        self.alerts.evaluate_record(&record, recent);

        debug!(
            fingerprint = %record.fingerprint,
            severity = %record.severity,
            category = %record.category,
            count = record.count,
            "Error tracked"
        );
        record
    }

    /// Track a Rust error value, capturing a backtrace as the stack trace
    pub async fn track_exception<E>(&self, error: &E, context: ErrorContext) -> ErrorRecord
    where
        E: std::fmt::Display,
    {
        let exception_type = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or("Error");
        let stack_trace = std::backtrace::Backtrace::force_capture().to_string();
        self.track_error(&error.to_string(), exception_type, &stack_trace, context)
            .await
    }

    /// Look up a record by id
    pub async fn get_error(&self, id: Uuid) -> Option<ErrorRecord> {
        self.store.get_by_id(id).await
    }

    /// Mark a record resolved. Returns false when the id is unknown.
    pub async fn resolve_error(&self, id: Uuid, notes: &str) -> bool {
        let resolved = self.store.resolve(id, notes).await;
        if resolved {
            info!(%id, "Error resolved");
        }
        resolved
    }

    /// Most frequent errors, highest count first
    pub async fn get_top_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        self.store.top_errors(limit).await
    }

    /// Errors seen within the trailing window, most recent first
    pub async fn get_recent_errors(&self, window: std::time::Duration) -> Vec<ErrorRecord> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::hours(1));
        self.store.recent_errors(cutoff).await
    }

    /// Current statistics snapshot (as of the last refresh)
    pub async fn get_stats(&self) -> ErrorStats {
        self.stats.current().await
    }

    /// Force a statistics recomputation now
    pub async fn refresh_stats(&self) {
        self.stats.refresh().await;
    }

    /// Per-day error rollups, oldest day first
    pub async fn get_trends(&self, days: u32) -> Vec<TrendEntry> {
        self.stats.trends(days).await
    }

    /// Install the alert notification callback
    pub fn set_alert_callback<F>(&self, callback: F)
    where
        F: Fn(Alert) + Send + Sync + 'static,
    {
        self.alerts.set_callback(callback);
    }

    /// Evaluate metric threshold rules against a batch of samples
    pub fn check_metrics(&self, metrics: &[MetricPoint]) {
        self.alerts.evaluate_metrics(metrics);
    }

    /// Alert history summary
    pub fn alert_summary(&self, recent_limit: usize) -> AlertSummary {
        self.alerts.summary(recent_limit)
    }

    /// Direct access to the alert manager
    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    /// Export all tracked errors and current statistics to a file.
    ///
    /// Supported formats: "json" (records plus statistics) and "csv"
    /// (records only).
    pub async fn export_errors(&self, path: &Path, format: &str) -> VigilResult<()> {
        let mut records = self.store.records_snapshot().await;
        records.sort_by(|a, b| a.first_seen.cmp(&b.first_seen));

        let contents = match format {
            "json" => {
                self.stats.refresh().await;
                let statistics = self.stats.current().await;
                let payload = ExportPayload {
                    export_timestamp: Utc::now(),
                    // Same definition as the statistics block: sum of
                    // record counts
                    total_errors: statistics.total_errors,
                    statistics,
                    errors: records,
                };
                serde_json::to_string_pretty(&payload)?
            }
            "csv" => render_csv(&records),
            other => return Err(VigilError::unsupported_export_format(other)),
        };

        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("writing export to {}", path.display()))?;
        info!(path = %path.display(), format, "📤 Errors exported");
        Ok(())
    }
}

#[derive(Serialize)]
struct ExportPayload {
    export_timestamp: DateTime<Utc>,
    total_errors: u64,
    statistics: ErrorStats,
    errors: Vec<ErrorRecord>,
}

const CSV_HEADER: &str = "ID,Timestamp,Severity,Category,Message,Exception Type,Count,Resolved,Function,Module";

fn render_csv(records: &[ErrorRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for record in records {
        let row = [
            record.id.to_string(),
            record.timestamp.to_rfc3339(),
            record.severity.to_string(),
            record.category.to_string(),
            record.message.clone(),
            record.exception_type.clone(),
            record.count.to_string(),
            record.resolved.to_string(),
            record.context.function_name.clone().unwrap_or_default(),
            record.context.module_name.clone().unwrap_or_default(),
        ];
        let escaped: Vec<String> = row.iter().map(|field| csv_escape(field)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

/// Quote a CSV field when it contains a delimiter, quote, or newline
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
