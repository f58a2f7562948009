//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::service::GenerationService;

#[instrument(level = "info", skip(ws, service))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(service): State<Arc<GenerationService>>) -> impl IntoResponse {
  info!(target: "edmoti_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, service))
}

#[instrument(level = "info", skip(socket, service), fields(conn_id = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, service: Arc<GenerationService>) {
  info!(target: "edmoti_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "edmoti_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &service).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "edmoti_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "edmoti_backend", "WebSocket disconnected");
}

async fn handle_client_ws(msg: ClientWsMessage, service: &GenerationService) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,
    ClientWsMessage::GenerateLesson(req) => ServerWsMessage::Lesson(do_generate_lesson(service, req).await),
    ClientWsMessage::GeneratePlan(req) => ServerWsMessage::Plan(do_generate_plan(service, req).await),
    ClientWsMessage::TutorMessage(req) => ServerWsMessage::TutorReply(do_tutor_reply(service, req).await),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AgentConfig;

  #[tokio::test]
  async fn ping_and_offline_lesson_dispatch() {
    let service = GenerationService::new(None, AgentConfig::default());
    assert!(matches!(handle_client_ws(ClientWsMessage::Ping, &service).await, ServerWsMessage::Pong));

    let msg: ClientWsMessage = serde_json::from_str(
      r#"{"type":"generate_lesson","topicId":"geo-1","topicTitle":"Pythagoras Theorem","isCalibration":true,
          "student":{"id":"u","name":"n","learningStyle":"Verbal","contentPreference":"Explanation First"}}"#,
    )
    .unwrap();
    match handle_client_ws(msg, &service).await {
      ServerWsMessage::Lesson(out) => {
        assert_eq!(out.outcome, "fallback");
        assert_eq!(out.lesson.topic_id, "geo-1");
      }
      other => panic!("unexpected {:?}", other),
    }
  }
}
