// Error Tracker Tests - Project Vigil

use super::*;

fn tracker() -> ErrorTracker {
    ErrorTracker::new(TrackerConfig::default())
}

#[tokio::test]
async fn test_identical_errors_aggregate() {
    let tracker = tracker();

    let mut last = None;
    for _ in 0..5 {
        let record = tracker
            .track_error(
                "Auth failed: invalid token",
                "AuthenticationError",
                "at src/auth.rs:42",
                ErrorContext::new().with_function("login"),
            )
            .await;
        last = Some(record);
    }

    let record = last.unwrap();
    assert_eq!(record.count, 5);
    assert_eq!(record.category, Category::Authentication);

    let top = tracker.get_top_errors(10).await;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].count, 5);
}

#[tokio::test]
async fn test_distinct_errors_get_distinct_records() {
    let tracker = tracker();
    tracker
        .track_error("a", "TypeA", "", ErrorContext::new())
        .await;
    tracker
        .track_error("b", "TypeB", "", ErrorContext::new())
        .await;

    assert_eq!(tracker.get_top_errors(10).await.len(), 2);
}

#[tokio::test]
async fn test_track_error_with_overrides() {
    let tracker = tracker();
    let record = tracker
        .track_error_with(
            "looks harmless",
            "Harmless",
            "",
            ErrorContext::new(),
            Some(Severity::Fatal),
            Some(Category::BusinessLogic),
        )
        .await;

    assert_eq!(record.severity, Severity::Fatal);
    assert_eq!(record.category, Category::BusinessLogic);
}

#[tokio::test]
async fn test_track_exception_uses_type_name() {
    let tracker = tracker();
    let error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
    let record = tracker.track_exception(&error, ErrorContext::new()).await;

    assert_eq!(record.exception_type, "Error");
    assert!(record.message.contains("missing file"));
    assert!(!record.stack_trace.is_empty());
}

#[tokio::test]
async fn test_resolve_and_stats() {
    let tracker = tracker();
    let record = tracker
        .track_error("boom", "ValueError", "", ErrorContext::new())
        .await;
    tracker
        .track_error("other", "TypeError", "", ErrorContext::new())
        .await;

    assert!(tracker.resolve_error(record.id, "patched").await);
    assert!(!tracker.resolve_error(Uuid::new_v4(), "n/a").await);

    tracker.refresh_stats().await;
    let stats = tracker.get_stats().await;
    assert_eq!(stats.total_errors, 2);
    assert!((stats.resolution_rate - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_critical_error_raises_alert() {
    let tracker = tracker();
    tracker
        .track_error(
            "corrupted heap",
            "SystemError",
            "",
            ErrorContext::new(),
        )
        .await;

    let summary = tracker.alert_summary(5);
    assert_eq!(summary.total_alerts, 1);
    assert_eq!(summary.recent_alerts[0].name, "critical_error");
}

#[tokio::test]
async fn test_alert_callback_fires() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let tracker = tracker();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    tracker.set_alert_callback(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tracker
        .track_error("fatal corruption detected", "SystemError", "", ErrorContext::new())
        .await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_recent_errors() {
    let tracker = tracker();
    tracker
        .track_error("fresh", "E", "", ErrorContext::new())
        .await;

    let recent = tracker
        .get_recent_errors(std::time::Duration::from_secs(3600))
        .await;
    assert_eq!(recent.len(), 1);

    let none = tracker
        .get_recent_errors(std::time::Duration::from_secs(0))
        .await;
    assert!(none.len() <= 1); // zero-width window may still catch this instant
}

#[tokio::test]
async fn test_trends_cover_requested_days() {
    let tracker = tracker();
    tracker
        .track_error("boom", "E", "", ErrorContext::new())
        .await;

    let trends = tracker.get_trends(7).await;
    assert_eq!(trends.len(), 7);
    assert_eq!(trends[6].total_errors, 1);
    assert_eq!(trends[0].total_errors, 0);
    assert_eq!(trends[0].top_category, "none");
}

#[tokio::test]
async fn test_export_json() {
    let tracker = tracker();
    tracker
        .track_error("boom", "ValueError", "", ErrorContext::new())
        .await;
    tracker
        .track_error("boom", "ValueError", "", ErrorContext::new())
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.json");
    tracker.export_errors(&path, "json").await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["total_errors"], 2);
    assert_eq!(parsed["errors"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["errors"][0]["count"], 2);
    // The top-level field and the statistics block agree by definition
    assert_eq!(parsed["statistics"]["total_errors"], parsed["total_errors"]);
}

#[tokio::test]
async fn test_export_csv() {
    let tracker = tracker();
    for message in ["first error", "second, with comma", "third \"quoted\""] {
        tracker
            .track_error(
                message,
                "ValueError",
                "",
                ErrorContext::new().with_function("job"),
            )
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.csv");
    tracker.export_errors(&path, "csv").await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("ID,Timestamp,Severity"));
    assert!(raw.contains("first error"));
    assert!(raw.contains("\"second, with comma\""));
    assert!(raw.contains("\"third \"\"quoted\"\"\""));
}

#[tokio::test]
async fn test_export_unsupported_format() {
    let tracker = tracker();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.xml");

    let result = tracker.export_errors(&path, "xml").await;
    assert!(matches!(
        result,
        Err(VigilError::UnsupportedExportFormat { .. })
    ));
}

#[tokio::test]
async fn test_start_and_shutdown() {
    let tracker = tracker();
    tracker.start().await;
    tracker
        .track_error("boom", "E", "", ErrorContext::new())
        .await;
    tracker.shutdown().await;
}

#[tokio::test]
async fn test_csv_escape() {
    assert_eq!(csv_escape("plain"), "plain");
    assert_eq!(csv_escape("a,b"), "\"a,b\"");
    assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
}
