//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Generation failures never surface as error statuses; the `outcome` field says
//! whether content is live, cached, degraded or absent.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::instrument;

use crate::logic::*;
use crate::protocol::*;
use crate::service::GenerationService;

#[instrument(level = "info", skip(service))]
pub async fn http_health(State(service): State<Arc<GenerationService>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generator: service.has_generator() })
}

#[instrument(level = "info", skip(service, body), fields(topic_id = %body.topic_id))]
pub async fn http_post_lesson(
  State(service): State<Arc<GenerationService>>,
  Json(body): Json<LessonIn>,
) -> impl IntoResponse {
  Json(do_generate_lesson(&service, body).await)
}

#[instrument(level = "info", skip(service, body), fields(student_id = %body.student.id))]
pub async fn http_post_plan(
  State(service): State<Arc<GenerationService>>,
  Json(body): Json<PlanIn>,
) -> impl IntoResponse {
  Json(do_generate_plan(&service, body).await)
}

#[instrument(level = "info", skip(service, body), fields(question_len = body.question.len()))]
pub async fn http_post_tutor(
  State(service): State<Arc<GenerationService>>,
  Json(body): Json<TutorIn>,
) -> impl IntoResponse {
  Json(do_tutor_reply(&service, body).await)
}
