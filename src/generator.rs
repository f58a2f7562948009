//! Boundary to the remote text generator. The orchestrator only sees this trait;
//! concrete backends live in `gemini.rs` and `openai.rs`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::GenerationError;
use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One call to the generator.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
  /// Backend model id; empty means "use the client's configured model".
  pub model: String,
  pub prompt: String,
  /// Allow the backend to ground the answer with live web search.
  pub enable_search: bool,
  /// Reasoning token budget; 0 disables thinking on backends that support it.
  pub thinking_budget: u32,
  pub temperature: Option<f32>,
}

impl GenerationRequest {
  pub fn new(prompt: impl Into<String>) -> Self {
    Self { model: String::new(), prompt: prompt.into(), enable_search: false, thinking_budget: 0, temperature: None }
  }

  pub fn with_search(mut self, enable: bool) -> Self {
    self.enable_search = enable;
    self
  }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
  /// Return the generated text, expected to contain a JSON payload or prose.
  async fn generate(&self, req: &GenerationRequest) -> Result<String, GenerationError>;

  /// Short name for logs.
  fn name(&self) -> &str;
}

/// Per-request timeout from GENERATOR_TIMEOUT_SECS; unset, unparseable or zero means the default.
fn timeout_secs(raw: Option<&str>) -> u64 {
  raw
    .and_then(|s| s.trim().parse::<u64>().ok())
    .filter(|s| *s > 0)
    .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

/// Shared reqwest client with the configured per-request timeout.
/// A builder failure is logged here; callers only see None.
pub fn http_client() -> Option<reqwest::Client> {
  let secs = timeout_secs(std::env::var("GENERATOR_TIMEOUT_SECS").ok().as_deref());
  match reqwest::Client::builder().timeout(Duration::from_secs(secs)).build() {
    Ok(client) => Some(client),
    Err(e) => {
      error!(target: "edmoti_backend", error = %e, timeout_secs = secs, "Failed to build HTTP client for generator");
      None
    }
  }
}

/// Pick a backend from GENERATOR_PROVIDER (`gemini` default, or `openai`).
/// Returns None when the selected backend has no API key or its HTTP client
/// could not be built (the latter is logged by `http_client`).
pub fn generator_from_env() -> Option<Arc<dyn ContentGenerator>> {
  let provider = std::env::var("GENERATOR_PROVIDER").unwrap_or_else(|_| "gemini".into());
  let generator: Option<Arc<dyn ContentGenerator>> = match provider.to_lowercase().as_str() {
    "openai" => OpenAiClient::from_env().map(|c| Arc::new(c) as Arc<dyn ContentGenerator>),
    _ => GeminiClient::from_env().map(|c| Arc::new(c) as Arc<dyn ContentGenerator>),
  };
  if generator.is_none() {
    info!(target: "edmoti_backend", %provider, "Generator provider not configured");
  }
  generator
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timeout_falls_back_to_default() {
    assert_eq!(timeout_secs(None), DEFAULT_TIMEOUT_SECS);
    assert_eq!(timeout_secs(Some("abc")), DEFAULT_TIMEOUT_SECS);
    assert_eq!(timeout_secs(Some("0")), DEFAULT_TIMEOUT_SECS);
    assert_eq!(timeout_secs(Some(" 15 ")), 15);
  }

  #[test]
  fn http_client_builds_with_default_settings() {
    assert!(http_client().is_some());
  }
}
