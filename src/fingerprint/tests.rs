// Fingerprint Tests - Project Vigil

use super::*;
use crate::types::ErrorContext;

#[test]
fn test_fingerprint_is_deterministic() {
    let fp = Fingerprinter::new();
    let context = ErrorContext::new()
        .with_function("parse_segment")
        .with_module("vtt_reader")
        .with_line(42);

    let a = fp.fingerprint("boom", "ParseError", "at src/reader.rs:42", &context);
    let b = fp.fingerprint("boom", "ParseError", "at src/reader.rs:42", &context);
    assert_eq!(a, b);
    assert_eq!(a.len(), 64); // sha-256 hex
}

#[test]
fn test_fingerprint_differs_on_exception_type() {
    let fp = Fingerprinter::new();
    let context = ErrorContext::new();
    let a = fp.fingerprint("boom", "ParseError", "", &context);
    let b = fp.fingerprint("boom", "ValueError", "", &context);
    assert_ne!(a, b);
}

#[test]
fn test_fingerprint_truncates_long_messages() {
    let fp = Fingerprinter::new();
    let context = ErrorContext::new();
    let prefix: String = "x".repeat(200);
    let a = fp.fingerprint(&format!("{prefix}AAAA"), "E", "", &context);
    let b = fp.fingerprint(&format!("{prefix}BBBB"), "E", "", &context);
    // Divergence past the 200-char prefix does not change the identity
    assert_eq!(a, b);
}

#[test]
fn test_fingerprint_ignores_library_frames() {
    let fp = Fingerprinter::new();
    let context = ErrorContext::new();
    let trace_a = "at /usr/lib/tokio/runtime.rs:10\nat src/pipeline.rs:5";
    let trace_b = "at /opt/other/runtime.rs:99\nat src/pipeline.rs:5";
    let a = fp.fingerprint("boom", "E", trace_a, &context);
    let b = fp.fingerprint("boom", "E", trace_b, &context);
    assert_eq!(a, b);
}

#[test]
fn test_fingerprint_uses_app_frames() {
    let fp = Fingerprinter::new();
    let context = ErrorContext::new();
    let a = fp.fingerprint("boom", "E", "at src/pipeline.rs:5", &context);
    let b = fp.fingerprint("boom", "E", "at src/writer.rs:9", &context);
    assert_ne!(a, b);
}

#[test]
fn test_fingerprint_custom_markers() {
    let fp = Fingerprinter::with_markers(vec!["myapp/".to_string()]);
    let context = ErrorContext::new();
    let a = fp.fingerprint("boom", "E", "at myapp/core.rs:1", &context);
    let b = fp.fingerprint("boom", "E", "at elsewhere/core.rs:1", &context);
    assert_ne!(a, b);
}

#[test]
fn test_fingerprint_context_changes_identity() {
    let fp = Fingerprinter::new();
    let a = fp.fingerprint("boom", "E", "", &ErrorContext::new().with_function("f1"));
    let b = fp.fingerprint("boom", "E", "", &ErrorContext::new().with_function("f2"));
    assert_ne!(a, b);
}
