//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::service::GenerationService;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(service: Arc<GenerationService>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/lesson", post(http::http_post_lesson))
        .route("/api/v1/plan", post(http::http_post_plan))
        .route("/api/v1/tutor", post(http::http_post_tutor))
        .with_state(service)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AgentConfig;

    fn offline_router() -> Router {
        build_router(Arc::new(GenerationService::new(None, AgentConfig::default())))
    }

    async fn post_json(router: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = router.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const STUDENT: &str = r#"{"id": "user-1", "name": "sam", "learningStyle": "Visual", "contentPreference": "Example First"}"#;

    #[tokio::test]
    async fn health_reports_generator_state() {
        let res = offline_router()
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["ok"], true);
        assert_eq!(v["generator"], false);
    }

    #[tokio::test]
    async fn lesson_endpoint_serves_fallback_offline() {
        let body = format!(
            r#"{{"topicId": "alg-1", "topicTitle": "Solving Linear Equations", "student": {}}}"#,
            STUDENT
        );
        let (status, v) = post_json(offline_router(), "/api/v1/lesson", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["outcome"], "fallback");
        assert_eq!(v["lesson"]["title"], "Solving Linear Equations (Offline Mode)");
        assert_eq!(v["lesson"]["topicId"], "alg-1");
        assert_eq!(v["lesson"]["steps"][0]["correctAnswerIndex"], 2);
    }

    #[tokio::test]
    async fn plan_endpoint_returns_null_plan_offline() {
        let body = format!(
            r#"{{"student": {}, "topics": [{{"id": "alg-1", "title": "Solving Linear Equations", "category": "Algebra", "mastery": "Unfamiliar", "progress": 0}}]}}"#,
            STUDENT
        );
        let (status, v) = post_json(offline_router(), "/api/v1/plan", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["outcome"], "absent");
        assert!(v["plan"].is_null());
    }

    #[tokio::test]
    async fn tutor_endpoint_returns_unavailable_notice_offline() {
        let body = r#"{"studentName": "sam", "context": "Surds", "question": "why?", "learningStyle": "Visual"}"#;
        let (status, v) = post_json(offline_router(), "/api/v1/tutor", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["outcome"], "unavailable");
        assert_eq!(v["text"], crate::service::TUTOR_UNAVAILABLE);
    }
}
