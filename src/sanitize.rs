//! Cleanup of raw generator text before JSON parsing.
//!
//! Order: trim, strip a fenced code block (with or without language tag), apply
//! the repair rules in `REPAIR_RULES`, then deserialize. Repairs are
//! best-effort and purely textual.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::GenerationError;

/// Textual fixes for near-valid JSON, applied in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairRule {
  /// `"A" "B"` → `"A", "B"`: two string tokens separated only by whitespace.
  MissingSeparator,
  /// `[1, 2, ]` → `[1, 2]`, `{"a": 1,}` → `{"a": 1}`.
  TrailingSeparator,
}

pub const REPAIR_RULES: [RepairRule; 2] = [RepairRule::MissingSeparator, RepairRule::TrailingSeparator];

impl RepairRule {
  pub fn apply(&self, text: &str) -> String {
    match self {
      RepairRule::MissingSeparator => missing_separator_re().replace_all(text, "${1}\", \"").into_owned(),
      RepairRule::TrailingSeparator => trailing_separator_re().replace_all(text, "${1}").into_owned(),
    }
  }
}

fn missing_separator_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  // Closing quote must not be escaped; the preceding char is captured and kept.
  RE.get_or_init(|| Regex::new(r#"([^\\])"\s+""#).expect("static regex"))
}

fn trailing_separator_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r",\s*([\]}])").expect("static regex"))
}

fn fence_open_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^```[A-Za-z0-9_+-]*").expect("static regex"))
}

/// Remove a leading ```lang marker and its closing ``` if present.
pub fn strip_fences(text: &str) -> &str {
  let trimmed = text.trim();
  if !trimmed.starts_with("```") {
    return trimmed;
  }
  let open_len = fence_open_re().find(trimmed).map(|m| m.end()).unwrap_or(3);
  let inner = &trimmed[open_len..];
  inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Trim, unwrap fences and apply every repair rule.
pub fn clean(raw: &str) -> String {
  let mut text = strip_fences(raw).to_string();
  for rule in REPAIR_RULES {
    text = rule.apply(&text);
  }
  text
}

/// Clean `raw` and deserialize it as `T`. Failures map to `MalformedContent`.
pub fn parse<T: DeserializeOwned>(raw: &str) -> Result<T, GenerationError> {
  let cleaned = clean(raw);
  serde_json::from_str::<T>(&cleaned).map_err(|e| GenerationError::MalformedContent(e.to_string()))
}
