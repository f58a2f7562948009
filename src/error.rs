//! Failure taxonomy for calls into the content generator.

use thiserror::Error;

/// Substrings (lowercased) that mark a rate-limit or quota rejection even when
/// the status code did not make it through.
const RATE_LIMIT_MARKERS: &[&str] = &["429", "quota", "resource_exhausted"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
  /// Rate limited or temporarily unavailable. Retried with backoff.
  #[error("generator temporarily unavailable (status {status:?}): {message}")]
  Transient { status: Option<u16>, message: String },

  /// Anything else the generator (or the transport) reports. Never retried.
  #[error("generator failed: {0}")]
  Fatal(String),

  /// Text came back but did not parse into the expected shape.
  #[error("malformed content: {0}")]
  MalformedContent(String),
}

impl GenerationError {
  pub fn is_transient(&self) -> bool {
    matches!(self, GenerationError::Transient { .. })
  }

  /// Classify an HTTP failure from a generator backend.
  pub fn from_http(status: u16, message: impl Into<String>) -> Self {
    let message = message.into();
    if status == 429 || status == 503 || has_rate_limit_marker(&message) {
      GenerationError::Transient { status: Some(status), message }
    } else {
      GenerationError::Fatal(format!("HTTP {}: {}", status, message))
    }
  }

  /// Classify a failure that carries only a message (no status code).
  pub fn from_message(message: impl Into<String>) -> Self {
    let message = message.into();
    if has_rate_limit_marker(&message) {
      GenerationError::Transient { status: None, message }
    } else {
      GenerationError::Fatal(message)
    }
  }
}

fn has_rate_limit_marker(message: &str) -> bool {
  let lower = message.to_lowercase();
  RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}
