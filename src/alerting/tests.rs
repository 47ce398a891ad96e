// Alerting Tests - Project Vigil

use super::*;
use crate::types::{Category, ErrorContext};
use std::sync::atomic::{AtomicUsize, Ordering};

fn record(severity: Severity) -> ErrorRecord {
    ErrorRecord::new(
        severity,
        Category::Unknown,
        "database connection lost",
        "ConnectionError",
        "",
        ErrorContext::new(),
        "fp-test".to_string(),
    )
}

#[test]
fn test_alert_level_display() {
    assert_eq!(AlertLevel::Warning.to_string(), "WARNING");
    assert_eq!(AlertLevel::Emergency.to_string(), "EMERGENCY");
}

#[test]
fn test_condition_matches() {
    assert!(AlertCondition::GreaterThan.matches(81.0, 80.0));
    assert!(!AlertCondition::GreaterThan.matches(80.0, 80.0));
    assert!(AlertCondition::LessThan.matches(400.0, 500.0));
    assert!(AlertCondition::Equals.matches(50.0004, 50.0));
    assert!(!AlertCondition::Equals.matches(50.1, 50.0));
}

#[test]
fn test_dispatch_sends_and_records_history() {
    let manager = AlertManager::new(AlertingConfig::default());
    let sent = manager.dispatch(Alert::new(AlertLevel::Info, "test_alert", "hello"));
    assert!(sent);

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].name, "test_alert");
}

#[test]
fn test_dispatch_throttles_repeats_within_window() {
    let manager = AlertManager::new(AlertingConfig::default());
    assert!(manager.dispatch(Alert::new(AlertLevel::Warning, "noisy", "first")));
    assert!(!manager.dispatch(Alert::new(AlertLevel::Warning, "noisy", "second")));
    assert!(!manager.dispatch(Alert::new(AlertLevel::Warning, "noisy", "third")));
    assert_eq!(manager.history().len(), 1);
}

#[test]
fn test_dispatch_different_levels_throttled_separately() {
    let manager = AlertManager::new(AlertingConfig::default());
    assert!(manager.dispatch(Alert::new(AlertLevel::Warning, "noisy", "a")));
    assert!(manager.dispatch(Alert::new(AlertLevel::Critical, "noisy", "b")));
}

#[test]
fn test_dispatch_sends_after_window_with_suppressed_count() {
    let config = AlertingConfig {
        aggregation_window_secs: 0,
        ..Default::default()
    };
    let manager = AlertManager::new(config);
    assert!(manager.dispatch(Alert::new(AlertLevel::Info, "x", "a")));
    // Zero-width window: the repeat passes and nothing was suppressed
    assert!(manager.dispatch(Alert::new(AlertLevel::Info, "x", "b")));
    assert_eq!(manager.history().len(), 2);
}

#[test]
fn test_callback_receives_alert() {
    let manager = AlertManager::new(AlertingConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    manager.set_callback(move |alert| {
        assert_eq!(alert.name, "cb_test");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    manager.dispatch(Alert::new(AlertLevel::Info, "cb_test", "hi"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_history_is_bounded() {
    let config = AlertingConfig {
        aggregation_window_secs: 0,
        max_alerts: 5,
        ..Default::default()
    };
    let manager = AlertManager::new(config);
    for i in 0..20 {
        manager.dispatch(Alert::new(AlertLevel::Info, format!("alert_{i}"), "x"));
    }
    assert_eq!(manager.history().len(), 5);
}

#[test]
fn test_evaluate_record_critical_raises_alert() {
    let manager = AlertManager::new(AlertingConfig::default());
    manager.evaluate_record(&record(Severity::Critical), 0);

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].name, "critical_error");
    assert_eq!(history[0].level, AlertLevel::Critical);
    assert!(history[0].details.contains_key("fingerprint"));
}

#[test]
fn test_evaluate_record_fatal_maps_to_critical_level() {
    let manager = AlertManager::new(AlertingConfig::default());
    manager.evaluate_record(&record(Severity::Fatal), 0);

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].level, AlertLevel::Critical);
}

#[test]
fn test_critical_and_fatal_share_one_suppression_window() {
    let manager = AlertManager::new(AlertingConfig::default());
    manager.evaluate_record(&record(Severity::Critical), 0);
    manager.evaluate_record(&record(Severity::Fatal), 0);

    // Same name and level, so the fatal repeat is suppressed
    assert_eq!(manager.history().len(), 1);
}

#[test]
fn test_evaluate_record_warning_is_quiet() {
    let manager = AlertManager::new(AlertingConfig::default());
    manager.evaluate_record(&record(Severity::Warning), 0);
    assert!(manager.history().is_empty());
}

#[test]
fn test_evaluate_record_spike_detection() {
    let manager = AlertManager::new(AlertingConfig::default());
    // At the threshold: no spike
    manager.evaluate_record(&record(Severity::Error), 20);
    assert!(manager.history().is_empty());
    // Above it: spike alert
    manager.evaluate_record(&record(Severity::Error), 21);
    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].name, "error_spike");
    assert_eq!(history[0].level, AlertLevel::Warning);
}

#[test]
fn test_evaluate_metrics_threshold_rules() {
    let manager = AlertManager::new(AlertingConfig::default());
    let metrics = vec![
        MetricPoint::new("cpu_percent", 97.5),
        MetricPoint::new("memory_percent", 50.0),
        MetricPoint::new("disk_percent", 91.0),
    ];
    manager.evaluate_metrics(&metrics);

    let names: Vec<String> = manager.history().into_iter().map(|a| a.name).collect();
    // 97.5% CPU trips both the warning and critical CPU rules
    assert!(names.contains(&"high_cpu".to_string()));
    assert!(names.contains(&"critical_cpu".to_string()));
    assert!(names.contains(&"high_disk".to_string()));
    assert!(!names.contains(&"high_memory".to_string()));
}

#[test]
fn test_evaluate_metrics_message_format() {
    let manager = AlertManager::new(AlertingConfig::default());
    manager.evaluate_metrics(&[MetricPoint::new("cpu_percent", 85.25)]);
    assert_eq!(manager.history()[0].message, "High CPU usage: 85.2%");
}

#[test]
fn test_evaluate_metrics_low_memory_rule() {
    let manager = AlertManager::new(AlertingConfig::default());
    manager.evaluate_metrics(&[MetricPoint::new("memory_available_mb", 200.0)]);
    let history = manager.history();
    assert_eq!(history[0].name, "low_memory_available");
    assert_eq!(history[0].message, "Low available memory: 200.0MB");
}

#[test]
fn test_summary() {
    let config = AlertingConfig {
        aggregation_window_secs: 0,
        ..Default::default()
    };
    let manager = AlertManager::new(config);
    manager.dispatch(Alert::new(AlertLevel::Info, "a", "x"));
    manager.dispatch(Alert::new(AlertLevel::Warning, "b", "y"));
    manager.dispatch(Alert::new(AlertLevel::Warning, "c", "z"));

    let summary = manager.summary(2);
    assert_eq!(summary.total_alerts, 3);
    assert_eq!(summary.alerts_by_level["WARNING"], 2);
    assert_eq!(summary.recent_alerts.len(), 2);
    assert_eq!(summary.recent_alerts[0].name, "c");
}

#[test]
fn test_resolve_alert_and_active_list() {
    let config = AlertingConfig {
        aggregation_window_secs: 0,
        ..Default::default()
    };
    let manager = AlertManager::new(config);
    manager.dispatch(Alert::new(AlertLevel::Warning, "disk_slow", "x"));
    manager.dispatch(Alert::new(AlertLevel::Warning, "queue_full", "y"));

    assert_eq!(manager.active_alerts().len(), 2);
    assert!(manager.resolve_alert("disk_slow"));
    assert!(!manager.resolve_alert("disk_slow")); // already resolved
    assert!(!manager.resolve_alert("unknown"));

    let active = manager.active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "queue_full");
}

#[test]
fn test_custom_rules_replace_defaults() {
    let manager = AlertManager::new(AlertingConfig::default());
    manager.set_rules(vec![AlertRule::new(
        "queue_depth",
        "queue_len",
        AlertCondition::GreaterThan,
        100.0,
        AlertLevel::Critical,
        "Queue backlog",
    )]);

    manager.evaluate_metrics(&[
        MetricPoint::new("cpu_percent", 99.0),
        MetricPoint::new("queue_len", 150.0),
    ]);
    let names: Vec<String> = manager.history().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["queue_depth".to_string()]);
}
