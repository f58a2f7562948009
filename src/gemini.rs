//! Minimal Gemini client (`models/{model}:generateContent`).
//!
//! Supports optional Google Search grounding and a thinking budget. Calls are
//! instrumented with model name, latency and response size (never contents).
//!
//! NOTE: the API key travels in a header and is never logged.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::GenerationError;
use crate::generator::{http_client, ContentGenerator, GenerationRequest};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl GeminiClient {
  /// Construct the client if we find GEMINI_API_KEY (or API_KEY); otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("API_KEY")).ok()?;
    if api_key.trim().is_empty() {
      return None;
    }
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into());
    let client = http_client()?;
    Some(Self { client, api_key, base_url, model })
  }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
  #[instrument(level = "info", skip(self, req), fields(model = %self.model, prompt_len = req.prompt.len(), search = req.enable_search))]
  async fn generate(&self, req: &GenerationRequest) -> Result<String, GenerationError> {
    let model = if req.model.is_empty() { self.model.as_str() } else { req.model.as_str() };
    let url = format!("{}/models/{}:generateContent", self.base_url, model);
    let body = build_request(req);

    let start = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "edmoti-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| GenerationError::from_message(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      return Err(GenerationError::from_http(status, msg));
    }

    let body: GenerateContentResponse =
      res.json().await.map_err(|e| GenerationError::Fatal(format!("invalid response body: {}", e)))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text = response_text(&body);
    info!(elapsed = ?start.elapsed(), text_len = text.len(), "Gemini response received");
    // Empty text is not an error here; each caller decides what it means.
    Ok(text)
  }

  fn name(&self) -> &str {
    "gemini"
  }
}

fn build_request(req: &GenerationRequest) -> GenerateContentRequest {
  GenerateContentRequest {
    contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: Some(req.prompt.clone()) }] }],
    tools: if req.enable_search { vec![Tool { google_search: GoogleSearch {} }] } else { vec![] },
    generation_config: GenerationConfig {
      temperature: req.temperature,
      thinking_config: ThinkingConfig { thinking_budget: req.thinking_budget },
    },
  }
}

/// Concatenate the text parts of the first candidate.
fn response_text(body: &GenerateContentResponse) -> String {
  body
    .candidates
    .first()
    .and_then(|c| c.content.as_ref())
    .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect::<Vec<_>>().join(""))
    .unwrap_or_default()
}

// --- Gemini DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  tools: Vec<Tool>,
  generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
  google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
  thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
  thinking_budget: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
  #[serde(default)]
  content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message (plus status tag) from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
    #[serde(default)]
    status: Option<String>,
  }
  let w = serde_json::from_str::<EWrap>(body).ok()?;
  Some(match w.error.status {
    Some(s) => format!("{}: {}", s, w.error.message),
    None => w.error.message,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn search_tool_only_when_enabled() {
    let plain = serde_json::to_value(build_request(&GenerationRequest::new("hi"))).unwrap();
    assert!(plain.get("tools").is_none());
    assert_eq!(plain["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
    assert_eq!(plain["contents"][0]["parts"][0]["text"], "hi");

    let search = serde_json::to_value(build_request(&GenerationRequest::new("hi").with_search(true))).unwrap();
    assert!(search["tools"][0].get("googleSearch").is_some());
  }

  #[test]
  fn response_text_joins_parts_of_first_candidate() {
    let body: GenerateContentResponse = serde_json::from_str(
      r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"a\":"},{"text":"1}"}]}}],
          "usageMetadata":{"promptTokenCount":3}}"#,
    )
    .unwrap();
    assert_eq!(response_text(&body), "{\"a\":1}");
  }

  #[test]
  fn error_body_keeps_status_tag_for_classification() {
    let msg = extract_gemini_error(r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#)
      .unwrap();
    assert_eq!(msg, "RESOURCE_EXHAUSTED: Quota exceeded");
    assert!(GenerationError::from_http(400, msg).is_transient());
  }

  /// Serve `body` for every request on an ephemeral local port; returns the base URL.
  async fn stub_backend(body: &'static str) -> String {
    let app = axum::Router::new().fallback(move || async move {
      ([(axum::http::header::CONTENT_TYPE, "application/json")], body)
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
  }

  fn stub_client(base_url: String) -> GeminiClient {
    GeminiClient { client: reqwest::Client::new(), api_key: "test-key".into(), base_url, model: "test-model".into() }
  }

  const EMPTY_CANDIDATE: &str = r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#;

  #[tokio::test]
  async fn empty_candidate_text_is_returned_as_ok() {
    let client = stub_client(stub_backend(EMPTY_CANDIDATE).await);
    assert_eq!(client.generate(&GenerationRequest::new("hi")).await, Ok(String::new()));
  }

  #[tokio::test]
  async fn empty_reply_gives_holding_tutor_text() {
    use crate::config::AgentConfig;
    use crate::service::{GenerationService, TutorOutcome, TUTOR_EMPTY_REPLY};
    use std::sync::Arc;

    let client = stub_client(stub_backend(EMPTY_CANDIDATE).await);
    let svc = GenerationService::new(Some(Arc::new(client)), AgentConfig::default());
    let out = svc.generate_tutor_reply("sam", "ctx", "what is x?", "Visual").await;
    assert_eq!(out, TutorOutcome::Generated(TUTOR_EMPTY_REPLY.into()));
  }
}
