//! Edmoti · Lesson Generation Backend
//!
//! - Axum HTTP + WebSocket API for micro-lessons, learning plans and tutor replies
//! - Gemini (default) or OpenAI-compatible content generation (via environment variables)
//! - Offline fallback lessons whenever generation is unavailable
//!
//! Important env variables:
//!   PORT                   : u16 (default 3000)
//!   GENERATOR_PROVIDER     : "gemini" (default) or "openai"
//!   GEMINI_API_KEY         : enables Gemini generation (API_KEY also accepted)
//!   GEMINI_BASE_URL        : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL           : default "gemini-2.5-flash"
//!   OPENAI_API_KEY         : enables the OpenAI-compatible backend
//!   OPENAI_BASE_URL        : default "https://api.openai.com/v1"
//!   OPENAI_MODEL           : default "gpt-4o-mini"
//!   GENERATOR_TIMEOUT_SECS : per-request timeout (default 60)
//!   AGENT_CONFIG_PATH      : path to TOML config (prompts + retry policy)
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

mod cache;
mod config;
mod domain;
mod error;
mod fallback;
mod gemini;
mod generator;
mod logic;
mod openai;
mod prompts;
mod protocol;
mod retry;
mod routes;
mod sanitize;
mod service;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::service::GenerationService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // One service per process: owns the caches, prompts and generator client.
  let service = Arc::new(GenerationService::from_env());

  let app = build_router(service);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "edmoti_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "edmoti_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "edmoti_backend", "Shutdown signal received");
}
