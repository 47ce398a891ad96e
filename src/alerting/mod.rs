// Alerting Module - Project Vigil
// "A horn blown twice for the same foe wakes no one"

#[cfg(test)]
mod tests;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::types::{ErrorRecord, Severity};

/// Occurrences within the spike window that trigger an error spike alert
const SPIKE_THRESHOLD: usize = 20;

/// Urgency of a dispatched alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatched alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: AlertLevel,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub resolved: bool,
}

impl Alert {
    pub fn new<N, M>(level: AlertLevel, name: N, message: M) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            name: name.into(),
            message: message.into(),
            details: HashMap::new(),
            resolved: false,
        }
    }

    pub fn with_detail<K: Into<String>, V: Into<serde_json::Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Comparison applied by a metric alert rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    GreaterThan,
    LessThan,
    Equals,
}

impl AlertCondition {
    pub fn matches(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::Equals => (value - threshold).abs() < 1e-3,
        }
    }
}

/// Threshold rule evaluated against sampled metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub name: String,
    pub metric: String,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub level: AlertLevel,
    pub message: String,
}

impl AlertRule {
    pub fn new<N, M, S>(
        name: N,
        metric: M,
        condition: AlertCondition,
        threshold: f64,
        level: AlertLevel,
        message: S,
    ) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            metric: metric.into(),
            condition,
            threshold,
            level,
            message: message.into(),
        }
    }
}

/// A sampled system metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Display unit, derived from the metric name suffix unless overridden
    #[serde(default)]
    pub unit: String,
}

impl MetricPoint {
    pub fn new<N: Into<String>>(name: N, value: f64) -> Self {
        let name = name.into();
        let unit = metric_unit(&name).to_string();
        Self {
            name,
            value,
            timestamp: Utc::now(),
            labels: HashMap::new(),
            unit,
        }
    }

    pub fn with_unit<U: Into<String>>(mut self, unit: U) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Built-in threshold rules for host resource metrics
pub fn default_metric_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            "high_cpu",
            "cpu_percent",
            AlertCondition::GreaterThan,
            80.0,
            AlertLevel::Warning,
            "High CPU usage",
        ),
        AlertRule::new(
            "critical_cpu",
            "cpu_percent",
            AlertCondition::GreaterThan,
            95.0,
            AlertLevel::Critical,
            "Critical CPU usage",
        ),
        AlertRule::new(
            "high_memory",
            "memory_percent",
            AlertCondition::GreaterThan,
            85.0,
            AlertLevel::Warning,
            "High memory usage",
        ),
        AlertRule::new(
            "critical_memory",
            "memory_percent",
            AlertCondition::GreaterThan,
            95.0,
            AlertLevel::Critical,
            "Critical memory usage",
        ),
        AlertRule::new(
            "low_memory_available",
            "memory_available_mb",
            AlertCondition::LessThan,
            500.0,
            AlertLevel::Critical,
            "Low available memory",
        ),
        AlertRule::new(
            "high_disk",
            "disk_percent",
            AlertCondition::GreaterThan,
            90.0,
            AlertLevel::Warning,
            "High disk usage",
        ),
        AlertRule::new(
            "critical_disk",
            "disk_percent",
            AlertCondition::GreaterThan,
            98.0,
            AlertLevel::Critical,
            "Critical disk usage",
        ),
    ]
}

/// Alerting configuration
#[derive(Debug, Clone)]
pub struct AlertingConfig {
    /// Suppression window for repeated alerts with the same name and level
    pub aggregation_window_secs: u64,
    /// Throttle cache entries kept before idle entries are purged
    pub max_cache_size: usize,
    /// Alert history entries kept (FIFO)
    pub max_alerts: usize,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            aggregation_window_secs: 300,
            max_cache_size: 1_000,
            max_alerts: 1_000,
        }
    }
}

struct ThrottleEntry {
    suppressed: u64,
    first_seen: DateTime<Utc>,
    last_sent: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Suppresses repeated alerts keyed by name and level.
///
/// The first alert for a key passes through; later alerts within the
/// aggregation window are absorbed into a suppressed count that rides
/// along on the next alert that passes.
struct AlertThrottle {
    window: Duration,
    max_cache_size: usize,
    entries: DashMap<String, ThrottleEntry>,
}

enum ThrottleDecision {
    /// Send, carrying the number of alerts suppressed since the last send
    Send { suppressed: u64 },
    Suppress,
}

impl AlertThrottle {
    fn new(window_secs: u64, max_cache_size: usize) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            max_cache_size,
            entries: DashMap::new(),
        }
    }

    fn check(&self, name: &str, level: AlertLevel) -> ThrottleDecision {
        let key = format!("{name}:{level}");
        let now = Utc::now();

        if let Some(mut entry) = self.entries.get_mut(&key) {
            entry.last_seen = now;
            if now - entry.last_sent < self.window {
                entry.suppressed += 1;
                return ThrottleDecision::Suppress;
            }
            let suppressed = entry.suppressed;
            entry.suppressed = 0;
            entry.last_sent = now;
            return ThrottleDecision::Send { suppressed };
        }

        self.entries.insert(
            key,
            ThrottleEntry {
                suppressed: 0,
                first_seen: now,
                last_sent: now,
                last_seen: now,
            },
        );
        if self.entries.len() > self.max_cache_size {
            self.purge_idle(now);
        }
        ThrottleDecision::Send { suppressed: 0 }
    }

    /// Drop entries idle for more than twice the aggregation window
    fn purge_idle(&self, now: DateTime<Utc>) {
        let horizon = self.window * 2;
        self.entries
            .retain(|_, entry| now - entry.last_seen <= horizon);
        debug!(remaining = self.entries.len(), "Purged idle throttle entries");
    }

    fn first_seen(&self, name: &str, level: AlertLevel) -> Option<DateTime<Utc>> {
        self.entries
            .get(&format!("{name}:{level}"))
            .map(|e| e.first_seen)
    }
}

/// Aggregate view of the alert history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_alerts: u64,
    pub alerts_by_level: HashMap<String, u64>,
    pub recent_alerts: Vec<Alert>,
}

/// Display unit for a metric name, derived from its suffix
fn metric_unit(metric: &str) -> &'static str {
    if metric.ends_with("_percent") {
        "%"
    } else if metric.ends_with("_mb") {
        "MB"
    } else {
        ""
    }
}

pub type AlertCallback = Arc<dyn Fn(Alert) + Send + Sync>;

/// Central alert dispatch: throttling, bounded history, and the
/// notification callback.
///
/// Locks here are std::sync and never held across await points or the
/// callback invocation.
pub struct AlertManager {
    config: AlertingConfig,
    throttle: AlertThrottle,
    rules: RwLock<Vec<AlertRule>>,
    history: RwLock<VecDeque<Alert>>,
    callback: RwLock<Option<AlertCallback>>,
}

impl AlertManager {
    pub fn new(config: AlertingConfig) -> Self {
        let throttle = AlertThrottle::new(config.aggregation_window_secs, config.max_cache_size);
        Self {
            config,
            throttle,
            rules: RwLock::new(default_metric_rules()),
            history: RwLock::new(VecDeque::new()),
            callback: RwLock::new(None),
        }
    }

    /// Install the notification callback, replacing any previous one
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(Alert) + Send + Sync + 'static,
    {
        *self.callback.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(callback));
    }

    /// Replace the metric rule set
    pub fn set_rules(&self, rules: Vec<AlertRule>) {
        *self.rules.write().unwrap_or_else(|e| e.into_inner()) = rules;
    }

    /// Dispatch an alert unless it is suppressed by the throttle.
    ///
    /// Returns true when the alert was actually sent.
    pub fn dispatch(&self, mut alert: Alert) -> bool {
        match self.throttle.check(&alert.name, alert.level) {
            ThrottleDecision::Suppress => {
                debug!(name = %alert.name, level = %alert.level, "Alert suppressed");
                return false;
            }
            ThrottleDecision::Send { suppressed } => {
                if suppressed > 0 {
                    alert = alert.with_detail("suppressed_count", suppressed);
                }
            }
        }

        match alert.level {
            AlertLevel::Info => info!(name = %alert.name, "🔔 {}", alert.message),
            AlertLevel::Warning => warn!(name = %alert.name, "🔔 {}", alert.message),
            AlertLevel::Critical | AlertLevel::Emergency => {
                error!(name = %alert.name, level = %alert.level, "🚨 {}", alert.message)
            }
        }

        {
            let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
            history.push_back(alert.clone());
            while history.len() > self.config.max_alerts {
                history.pop_front();
            }
        }

        let callback = self
            .callback
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(alert);
        }
        true
    }

    /// Evaluate record-driven alert rules after a tracked occurrence.
    ///
    /// `recent_occurrences` is the occurrence count over the trailing
    /// ten minutes, used for spike detection.
    pub fn evaluate_record(&self, record: &ErrorRecord, recent_occurrences: usize) {
        // Both CRITICAL and FATAL dispatch at the same level so they share
        // one suppression key
        if record.severity >= Severity::Critical {
            let alert = Alert::new(
                AlertLevel::Critical,
                "critical_error",
                format!("{}: {}", record.exception_type, record.message),
            )
            .with_detail("error_id", record.id.to_string())
            .with_detail("exception_type", record.exception_type.clone())
            .with_detail("category", record.category.to_string())
            .with_detail("fingerprint", record.fingerprint.clone())
            .with_detail("count", record.count);
            self.dispatch(alert);
        }

        if recent_occurrences > SPIKE_THRESHOLD {
            let alert = Alert::new(
                AlertLevel::Warning,
                "error_spike",
                format!("Error spike detected: {recent_occurrences} errors in 10 minutes"),
            )
            .with_detail("recent_occurrences", recent_occurrences as u64)
            .with_detail("threshold", SPIKE_THRESHOLD as u64);
            self.dispatch(alert);
        }
    }

    /// Evaluate the metric rule set against a batch of sampled metrics
    pub fn evaluate_metrics(&self, metrics: &[MetricPoint]) {
        let rules = self
            .rules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for metric in metrics {
            for rule in rules.iter().filter(|r| r.metric == metric.name) {
                if rule.condition.matches(metric.value, rule.threshold) {
                    let alert = Alert::new(
                        rule.level,
                        rule.name.clone(),
                        format!("{}: {:.1}{}", rule.message, metric.value, metric.unit),
                    )
                    .with_detail("metric", metric.name.clone())
                    .with_detail("value", metric.value)
                    .with_detail("threshold", rule.threshold);
                    self.dispatch(alert);
                }
            }
        }
    }

    /// Unresolved alerts currently in the history, oldest first
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|a| !a.resolved)
            .cloned()
            .collect()
    }

    /// Mark every unresolved alert with this name resolved.
    ///
    /// Returns true when at least one alert changed state.
    pub fn resolve_alert(&self, name: &str) -> bool {
        let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
        let mut any = false;
        for alert in history.iter_mut().filter(|a| a.name == name && !a.resolved) {
            alert.resolved = true;
            any = true;
        }
        if any {
            info!(name, "Alert resolved");
        }
        any
    }

    /// All alerts currently in the history, oldest first
    pub fn history(&self) -> Vec<Alert> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Summary of the alert history
    pub fn summary(&self, recent_limit: usize) -> AlertSummary {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());
        let mut alerts_by_level: HashMap<String, u64> = HashMap::new();
        for alert in history.iter() {
            *alerts_by_level.entry(alert.level.to_string()).or_insert(0) += 1;
        }
        let recent_alerts = history
            .iter()
            .rev()
            .take(recent_limit)
            .cloned()
            .collect();
        AlertSummary {
            total_alerts: history.len() as u64,
            alerts_by_level,
            recent_alerts,
        }
    }

    /// When the throttle first saw this name and level, if ever
    pub fn first_seen(&self, name: &str, level: AlertLevel) -> Option<DateTime<Utc>> {
        self.throttle.first_seen(name, level)
    }
}
