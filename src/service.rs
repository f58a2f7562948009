//! Generation service: one instance per process, shared by every handler.
//!
//! This module owns:
//!   - the optional content generator (None when no API key is configured)
//!   - prompt templates and retry policies (from TOML or defaults)
//!   - the lesson and plan caches with their single-flight slots
//!
//! None of the public operations fail. Lessons degrade to the offline fallback,
//! plans degrade to absent, tutor replies degrade to a fixed apology; the
//! outcome enums say which path was taken.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, Claim, LessonMode, ResultCache};
use crate::config::{load_agent_config_from_env, AgentConfig, Prompts};
use crate::domain::{LearningPlan, MicroLesson, StudentProfile, Topic};
use crate::error::GenerationError;
use crate::fallback::fallback_lesson;
use crate::generator::{generator_from_env, ContentGenerator, GenerationRequest};
use crate::prompts::{lesson_request, plan_request, tutor_request};
use crate::retry::{with_backoff, RetryPolicy};
use crate::sanitize;
use crate::util::{now_millis, trunc_for_log};

pub const TUTOR_UNAVAILABLE: &str = "I'm temporarily offline due to high traffic (429). Try again shortly!";
pub const TUTOR_EMPTY_REPLY: &str = "I'm analyzing that...";

#[derive(Clone, Debug, PartialEq)]
pub enum LessonOutcome {
  Generated(MicroLesson),
  Cached(MicroLesson),
  /// Offline content; the generator failed or returned unusable text.
  Fallback(MicroLesson),
}

impl LessonOutcome {
  #[cfg(test)]
  pub fn lesson(&self) -> &MicroLesson {
    match self {
      LessonOutcome::Generated(l) | LessonOutcome::Cached(l) | LessonOutcome::Fallback(l) => l,
    }
  }

  pub fn into_lesson(self) -> MicroLesson {
    match self {
      LessonOutcome::Generated(l) | LessonOutcome::Cached(l) | LessonOutcome::Fallback(l) => l,
    }
  }

  pub fn is_degraded(&self) -> bool {
    matches!(self, LessonOutcome::Fallback(_))
  }

  pub fn label(&self) -> &'static str {
    match self {
      LessonOutcome::Generated(_) => "generated",
      LessonOutcome::Cached(_) => "cached",
      LessonOutcome::Fallback(_) => "fallback",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlanOutcome {
  Generated(LearningPlan),
  Cached(LearningPlan),
  /// No plan; callers show a non-plan view.
  Absent,
}

impl PlanOutcome {
  pub fn plan(self) -> Option<LearningPlan> {
    match self {
      PlanOutcome::Generated(p) | PlanOutcome::Cached(p) => Some(p),
      PlanOutcome::Absent => None,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      PlanOutcome::Generated(_) => "generated",
      PlanOutcome::Cached(_) => "cached",
      PlanOutcome::Absent => "absent",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TutorOutcome {
  Generated(String),
  Unavailable(String),
}

impl TutorOutcome {
  pub fn text(&self) -> &str {
    match self {
      TutorOutcome::Generated(t) | TutorOutcome::Unavailable(t) => t,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      TutorOutcome::Generated(_) => "generated",
      TutorOutcome::Unavailable(_) => "unavailable",
    }
  }
}

pub struct GenerationService {
  generator: Option<Arc<dyn ContentGenerator>>,
  prompts: Prompts,
  lesson_policy: RetryPolicy,
  plan_policy: RetryPolicy,
  lessons: ResultCache<CacheKey, MicroLesson>,
  plans: ResultCache<CacheKey, LearningPlan>,
}

impl GenerationService {
  pub fn new(generator: Option<Arc<dyn ContentGenerator>>, config: AgentConfig) -> Self {
    Self {
      generator,
      prompts: config.prompts,
      lesson_policy: config.retry.lesson_policy(),
      plan_policy: config.retry.plan_policy(),
      lessons: ResultCache::new(),
      plans: ResultCache::new(),
    }
  }

  /// Build from env: TOML config (if any) and the configured generator backend.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Self {
    let config = load_agent_config_from_env().unwrap_or_default();
    let generator = generator_from_env();
    match &generator {
      Some(g) => info!(target: "edmoti_backend", generator = g.name(), "Content generation enabled."),
      None => warn!(target: "edmoti_backend", "Content generation disabled (no API key). Serving offline lessons only."),
    }
    Self::new(generator, config)
  }

  pub fn has_generator(&self) -> bool {
    self.generator.is_some()
  }

  /// Produce a lesson for the topic. Never fails; see `LessonOutcome`.
  #[instrument(level = "info", skip_all, fields(%topic_id, student_id = %student.id, calibration = is_calibration))]
  pub async fn generate_lesson(
    &self,
    topic_id: &str,
    topic_title: &str,
    student: &StudentProfile,
    is_calibration: bool,
  ) -> LessonOutcome {
    let mode = LessonMode::from_flag(is_calibration);
    let key = CacheKey::lesson(&student.id, topic_id, mode);
    let flight = match self.lessons.claim(&key).await {
      Claim::Hit(hit) => {
        debug!(target: "lesson", %key, "Lesson cache hit");
        return LessonOutcome::Cached(hit);
      }
      Claim::Waiter(waiter) => {
        debug!(target: "lesson", %key, "Joining in-flight lesson generation");
        return match waiter.wait().await {
          Some(lesson) => LessonOutcome::Cached(lesson),
          None => LessonOutcome::Fallback(fallback_lesson(topic_id, topic_title)),
        };
      }
      Claim::Leader(flight) => flight,
    };

    let req = lesson_request(&self.prompts, topic_id, topic_title, student, mode);
    match self.run_lesson(&req, &self.lesson_policy).await {
      Ok(mut lesson) => {
        lesson.topic_id = topic_id.to_string();
        if lesson.id.trim().is_empty() {
          lesson.id = Uuid::new_v4().to_string();
        }
        flight.complete(Some(lesson.clone())).await;
        info!(target: "lesson", %key, lesson_id = %lesson.id, steps = lesson.steps.len(), "Generated lesson cached");
        LessonOutcome::Generated(lesson)
      }
      Err(e) => {
        flight.complete(None).await;
        error!(target: "lesson", %key, error = %e, "Lesson generation failed; serving offline fallback");
        LessonOutcome::Fallback(fallback_lesson(topic_id, topic_title))
      }
    }
  }

  async fn run_lesson(&self, req: &GenerationRequest, policy: &RetryPolicy) -> Result<MicroLesson, GenerationError> {
    let raw = self.call_generator(req, policy).await?;
    let lesson: MicroLesson = sanitize::parse(&raw).map_err(|e| {
      warn!(target: "lesson", preview = %trunc_for_log(&raw, 120), error = %e, "Unparseable lesson text");
      e
    })?;
    lesson.validate().map_err(GenerationError::MalformedContent)?;
    Ok(lesson)
  }

  /// Short analogy-style answer for the chat tutor. Never fails.
  #[instrument(level = "info", skip_all, fields(%student_name, %learning_style, question_len = question.len()))]
  pub async fn generate_tutor_reply(
    &self,
    student_name: &str,
    context: &str,
    question: &str,
    learning_style: &str,
  ) -> TutorOutcome {
    let req = tutor_request(&self.prompts, student_name, context, question, learning_style);
    match self.call_generator(&req, &self.lesson_policy).await {
      Ok(text) => {
        let text = text.trim();
        if text.is_empty() {
          TutorOutcome::Generated(TUTOR_EMPTY_REPLY.to_string())
        } else {
          TutorOutcome::Generated(text.to_string())
        }
      }
      Err(e) => {
        error!(target: "tutor", error = %e, "Tutor reply failed; sending unavailable notice");
        TutorOutcome::Unavailable(TUTOR_UNAVAILABLE.to_string())
      }
    }
  }

  /// Sequence the next sessions for the student. Never fails; see `PlanOutcome`.
  #[instrument(level = "info", skip_all, fields(student_id = %student.id, topics = topics.len()))]
  pub async fn generate_learning_plan(&self, student: &StudentProfile, topics: &[Topic]) -> PlanOutcome {
    let key = CacheKey::plan(&student.id);
    let flight = match self.plans.claim(&key).await {
      Claim::Hit(hit) => {
        debug!(target: "plan", %key, "Plan cache hit");
        return PlanOutcome::Cached(hit);
      }
      Claim::Waiter(waiter) => {
        debug!(target: "plan", %key, "Joining in-flight plan generation");
        return waiter.wait().await.map_or(PlanOutcome::Absent, PlanOutcome::Cached);
      }
      Claim::Leader(flight) => flight,
    };

    let req = plan_request(&self.prompts, student, topics);
    let result = async {
      let raw = self.call_generator(&req, &self.plan_policy).await?;
      sanitize::parse::<LearningPlan>(&raw)
    }
    .await;

    match result {
      Ok(mut plan) => {
        if plan.generated_at == 0 {
          plan.generated_at = now_millis();
        }
        let total = plan.overall_strategy.total_percentage();
        if (total - 100.0).abs() > 0.5 {
          warn!(target: "plan", %key, total, "Plan focus percentages do not sum to 100");
        }
        flight.complete(Some(plan.clone())).await;
        info!(target: "plan", %key, sessions = plan.sequence.len(), "Generated plan cached");
        PlanOutcome::Generated(plan)
      }
      Err(e) => {
        flight.complete(None).await;
        error!(target: "plan", %key, error = %e, "Plan generation failed; no plan");
        PlanOutcome::Absent
      }
    }
  }

  async fn call_generator(&self, req: &GenerationRequest, policy: &RetryPolicy) -> Result<String, GenerationError> {
    let generator = self
      .generator
      .as_ref()
      .ok_or_else(|| GenerationError::Fatal("no content generator configured".into()))?;
    with_backoff(policy, move |attempt| {
      debug!(target: "edmoti_backend", generator = generator.name(), attempt = attempt + 1, "Calling generator");
      generator.generate(req)
    })
    .await
  }
}
