//! Loading agent configuration (prompt templates + retry policy) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `RetryCfg` for the expected schema. Every
//! field has a default, so a partial file only overrides what it names.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::retry::RetryPolicy;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub retry: RetryCfg,
}

/// Prompt templates. Placeholders use `{name}` and are filled by `prompts.rs`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Envelope for both lesson modes: {task_context} {search_step} {topic_id}
  /// {topic_title} {is_calibration} {flow}
  pub lesson_template: String,
  /// {topic_title} {weak_areas}
  pub calibration_context: String,
  /// {topic_title} {student_name} {tier} {style}
  pub standard_context: String,
  /// {topic_title}
  pub visual_search: String,
  /// {topic_title}
  pub verbal_search: String,
  /// {student_name} {learning_style} {context} {question}
  pub tutor_template: String,
  /// {student_data}
  pub plan_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      lesson_template: r#"
You are Edmoti's Lead Architect.
{task_context}
1. **SEARCH**: {search_step}
2. **GENERATE**: Create Micro-Lesson JSON.

OUTPUT JSON STRICTLY:
{
  "id": "unique_string",
  "topicId": "{topic_id}",
  "title": "{topic_title}",
  "estimatedMinutes": 5,
  "isCalibration": {is_calibration},
  "steps": [
    {
      "id": "step_1",
      "type": "diagnostic",
      "prompt": "Question text",
      "choices": ["A", "B", "C", "D"],
      "correctAnswerIndex": 0,
      "explanation": "Feedback",
      "content": "Text (100 words max)",
      "videoUrl": "https://www.youtube.com/watch?v=...",
      "videoTitle": "Video Title",
      "videoExplanation": "Why this video fits.",
      "videoTags": ["Tag1", "Tag2"]
    }
  ]
}
FLOW: {flow}
"#
      .into(),
      calibration_context: "TASK: Create a \"Calibration Mission\" (Initial Assessment).\nTopic: {topic_title} (Mix of weak areas: {weak_areas}).\nGoal: Assess actual level.\nStructure: 5 diagnostic questions only. No explanations.".into(),
      standard_context: "TASK: Create a Micro-Lesson.\nTopic: {topic_title} (GCSE Maths).\nProfile: {student_name}, Level: {tier}, Style: {style}.".into(),
      visual_search: "SEARCH: \"GCSE Maths {topic_title} visual\" or \"Cognito\".".into(),
      verbal_search: "SEARCH: \"GCSE Maths {topic_title} explanation\".".into(),
      tutor_template: "Act as Edmoti Tutor. Student: {student_name} ({learning_style}).\nContext: \"{context}\". Question: \"{question}\".\nGoal: Reassure, Explain Simply (Analogy), Keep Short.".into(),
      plan_template: r#"
You are acting as the Lesson Sequencing Engine for Edmoti.

INPUT DATA:
{student_data}

ALGORITHM:
1. Classify topics (Weak=A, Developing=B, Secure=C).
2. Prioritize prerequisites.
3. Plan next 3 sessions.
4. Balance: 60% A, 30% B, 10% C.

OUTPUT JSON STRICTLY:
{
  "planHorizonDays": 5,
  "sessionsPlanned": 3,
  "sequence": [
    {
      "sessionNumber": 1,
      "focus": "confidence",
      "topics": [
        { "topicId": "id", "topicName": "Name", "priorityBand": "A", "reason": "Why", "recommendedMicroLessons": 1 }
      ]
    }
  ],
  "overallStrategy": { "summary": "...", "percentageWeakFocus": 60, "percentageDevelopingFocus": 30, "percentageReviewFocus": 10 }
}
"#
      .into(),
    }
  }
}

/// Backoff knobs. Attempt counts include the first call.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
  pub lesson_max_attempts: u32,
  pub plan_max_attempts: u32,
  pub base_delay_ms: u64,
  pub max_jitter_ms: u64,
}

impl Default for RetryCfg {
  fn default() -> Self {
    Self { lesson_max_attempts: 5, plan_max_attempts: 3, base_delay_ms: 4000, max_jitter_ms: 2000 }
  }
}

impl RetryCfg {
  /// Policy for lesson and tutor generation.
  pub fn lesson_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.lesson_max_attempts, self.base(), self.jitter())
  }

  pub fn plan_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.plan_max_attempts, self.base(), self.jitter())
  }

  fn base(&self) -> Duration { Duration::from_millis(self.base_delay_ms) }
  fn jitter(&self) -> Duration { Duration::from_millis(self.max_jitter_ms) }
}

/// Parse a TOML document into `AgentConfig`.
pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "edmoti_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "edmoti_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "edmoti_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
