//! Minimal OpenAI-compatible client (chat.completions), for deployments that
//! point the generator at an OpenAI-style endpoint instead of Gemini.
//!
//! Search grounding and thinking budgets have no equivalent here and are ignored.
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::GenerationError;
use crate::generator::{http_client, ContentGenerator, GenerationRequest};

#[derive(Clone)]
pub struct OpenAiClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAiClient {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let client = http_client()?;
    Some(Self { client, api_key, base_url, model })
  }
}

#[async_trait]
impl ContentGenerator for OpenAiClient {
  #[instrument(level = "info", skip(self, req), fields(model = %self.model, prompt_len = req.prompt.len()))]
  async fn generate(&self, req: &GenerationRequest) -> Result<String, GenerationError> {
    if req.enable_search {
      debug!(target: "edmoti_backend", "Search grounding requested but not supported by chat.completions; ignoring");
    }
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: if req.model.is_empty() { self.model.clone() } else { req.model.clone() },
      messages: vec![ChatMessageReq { role: "user".into(), content: req.prompt.clone() }],
      temperature: req.temperature,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "edmoti-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await
      .map_err(|e| GenerationError::from_message(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(GenerationError::from_http(status, msg));
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| GenerationError::Fatal(format!("invalid response body: {}", e)))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();
    info!(elapsed = ?start.elapsed(), text_len = text.len(), "OpenAI response received");
    // Empty text is not an error here; each caller decides what it means.
    Ok(text)
  }

  fn name(&self) -> &str {
    "openai"
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
