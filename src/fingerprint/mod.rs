// Error Fingerprinting - Project Vigil
// "Two failures with one face are one failure"

#[cfg(test)]
mod tests;

use sha2::{Digest, Sha256};

use crate::types::ErrorContext;

/// Maximum message length folded into the signature
const MESSAGE_PREFIX_CHARS: usize = 200;

/// Maximum application stack lines folded into the signature
const MAX_STACK_LINES: usize = 3;

/// Default path markers identifying the application's own stack frames
pub const DEFAULT_APP_MARKERS: &[&str] = &["src/", "vigil"];

/// Derives a stable identity for a class of logically-identical errors.
///
/// The fingerprint is a SHA-256 hex digest over the error signature:
/// exception type, message prefix, context function/module/line, and up to
/// three stack lines matching the application path markers. It is a pure
/// function of its inputs; identical signatures always produce identical
/// fingerprints.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    app_markers: Vec<String>,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            app_markers: DEFAULT_APP_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Create a fingerprinter with custom application path markers
    pub fn with_markers(app_markers: Vec<String>) -> Self {
        Self { app_markers }
    }

    /// Compute the fingerprint for an error signature
    pub fn fingerprint(
        &self,
        message: &str,
        exception_type: &str,
        stack_trace: &str,
        context: &ErrorContext,
    ) -> String {
        let message_prefix: String = message.chars().take(MESSAGE_PREFIX_CHARS).collect();

        let mut parts: Vec<String> = vec![
            exception_type.to_string(),
            message_prefix,
            context.function_name.clone().unwrap_or_default(),
            context.module_name.clone().unwrap_or_default(),
            context
                .line_number
                .map(|n| n.to_string())
                .unwrap_or_default(),
        ];

        // Only frames from the application's own code paths contribute;
        // library and runtime frames vary too much between environments.
        parts.extend(
            stack_trace
                .lines()
                .filter(|line| self.app_markers.iter().any(|m| line.contains(m)))
                .map(|line| line.trim().to_string())
                .take(MAX_STACK_LINES),
        );

        let signature = parts.join("|");
        let digest = Sha256::digest(signature.as_bytes());
        hex::encode(digest)
    }
}
