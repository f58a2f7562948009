//! Core behaviors shared by both HTTP and WebSocket handlers: run the service
//! operation and shape its outcome into the public DTO.

use tracing::{info, instrument, warn};

use crate::protocol::{LessonIn, LessonOut, PlanIn, PlanOut, TutorIn, TutorOut};
use crate::service::GenerationService;

#[instrument(level = "info", skip(service, req), fields(topic_id = %req.topic_id, calibration = req.is_calibration))]
pub async fn do_generate_lesson(service: &GenerationService, req: LessonIn) -> LessonOut {
  let outcome = service
    .generate_lesson(&req.topic_id, &req.topic_title, &req.student, req.is_calibration)
    .await;
  let label = outcome.label();
  if outcome.is_degraded() {
    warn!(target: "lesson", topic_id = %req.topic_id, outcome = label, "Offline lesson served");
  } else {
    info!(target: "lesson", topic_id = %req.topic_id, outcome = label, "Lesson served");
  }
  LessonOut { lesson: outcome.into_lesson(), outcome: label }
}

#[instrument(level = "info", skip(service, req), fields(student_id = %req.student.id, topics = req.topics.len()))]
pub async fn do_generate_plan(service: &GenerationService, req: PlanIn) -> PlanOut {
  let outcome = service.generate_learning_plan(&req.student, &req.topics).await;
  let label = outcome.label();
  info!(target: "plan", student_id = %req.student.id, outcome = label, "Plan served");
  PlanOut { plan: outcome.plan(), outcome: label }
}

#[instrument(level = "info", skip(service, req), fields(question_len = req.question.len()))]
pub async fn do_tutor_reply(service: &GenerationService, req: TutorIn) -> TutorOut {
  let outcome = service
    .generate_tutor_reply(&req.student_name, &req.context, &req.question, &req.learning_style)
    .await;
  TutorOut { text: outcome.text().to_string(), outcome: outcome.label() }
}
