//! Domain models shared with the UI shell: student profile, topics, micro-lessons
//! and learning plans. Field names are camelCase on the wire and must stay stable;
//! cached and fallback content use the same shapes.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Counts written by the generator may arrive as `5` or `5.0`; round any
/// non-negative finite number.
fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
  let v = f64::deserialize(d)?;
  if v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX) {
    Ok(v.round() as u32)
  } else {
    Err(D::Error::custom(format!("expected a non-negative count, got {}", v)))
  }
}

/// Answer indices accept `2` or `2.0`, but never a fractional position.
fn lenient_opt_index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
  match Option::<f64>::deserialize(d)? {
    None => Ok(None),
    Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as usize)),
    Some(v) => Err(D::Error::custom(format!("expected a whole answer index, got {}", v))),
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LearningStyle {
  Visual,
  Verbal,
  #[serde(rename = "Hands-on")]
  HandsOn,
}

impl LearningStyle {
  pub fn as_str(&self) -> &'static str {
    match self {
      LearningStyle::Visual => "Visual",
      LearningStyle::Verbal => "Verbal",
      LearningStyle::HandsOn => "Hands-on",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentPreference {
  #[serde(rename = "Example First")]
  ExampleFirst,
  #[serde(rename = "Explanation First")]
  ExplanationFirst,
}

/// Attention span / confidence band. Used for both `focusMode` and `confidenceLevel`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Band {
  Low,
  #[default]
  Medium,
  High,
}

impl Band {
  pub fn as_lower(&self) -> &'static str {
    match self {
      Band::Low => "low",
      Band::Medium => "medium",
      Band::High => "high",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MasteryLevel {
  Unfamiliar,
  Emerging,
  Developing,
  Secure,
  #[serde(rename = "Exam Ready")]
  ExamReady,
}

impl MasteryLevel {
  pub fn as_lower(&self) -> &'static str {
    match self {
      MasteryLevel::Unfamiliar => "unfamiliar",
      MasteryLevel::Emerging => "emerging",
      MasteryLevel::Developing => "developing",
      MasteryLevel::Secure => "secure",
      MasteryLevel::ExamReady => "exam ready",
    }
  }
}

/// Read-only input to generation. Gamification fields sent by the UI (xp, coins,
/// streak...) are ignored on deserialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
  pub id: String,
  pub name: String,
  pub learning_style: LearningStyle,
  pub content_preference: ContentPreference,
  #[serde(default)]
  pub focus_mode: Band,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_grade: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub confidence_level: Option<Band>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weak_areas: Option<Vec<String>>,
}

impl StudentProfile {
  /// Lesson tier: grades 6-7 and 8-9 sit on the Higher paper.
  pub fn lesson_tier(&self) -> &'static str {
    match self.target_grade.as_deref() {
      Some(g) if g.contains("8-9") || g.contains("6-7") => "Higher",
      _ => "Foundation",
    }
  }

  /// Plan tier uses a narrower rule: only grades 8 or 9 count as higher.
  pub fn plan_tier(&self) -> &'static str {
    match self.target_grade.as_deref() {
      Some(g) if g.contains('8') || g.contains('9') => "higher",
      _ => "foundation",
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
  pub id: String,
  pub title: String,
  pub category: String,
  pub mastery: MasteryLevel,
  /// 0-100.
  pub progress: u8,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
  Diagnostic,
  Explanation,
  WorkedExample,
  Practice,
  Summary,
  Reward,
}

impl StepKind {
  /// Question steps must point `correctAnswerIndex` into `choices`.
  pub fn is_question(&self) -> bool {
    matches!(self, StepKind::Diagnostic | StepKind::Practice)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MicroLessonStep {
  #[serde(default)]
  pub id: String,
  #[serde(rename = "type")]
  pub kind: StepKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prompt: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub choices: Option<Vec<String>>,
  #[serde(default, deserialize_with = "lenient_opt_index", skip_serializing_if = "Option::is_none")]
  pub correct_answer_index: Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_explanation: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_tags: Option<Vec<String>>,
}

impl MicroLessonStep {
  /// Empty step of the given kind; fill the relevant fields afterwards.
  pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
    Self {
      id: id.into(),
      kind,
      prompt: None,
      content: None,
      choices: None,
      correct_answer_index: None,
      explanation: None,
      video_url: None,
      video_title: None,
      video_explanation: None,
      video_tags: None,
    }
  }

  pub fn has_valid_answer(&self) -> bool {
    match (&self.choices, self.correct_answer_index) {
      (Some(choices), Some(idx)) => idx < choices.len(),
      _ => false,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MicroLesson {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub topic_id: String,
  pub title: String,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub estimated_minutes: u32,
  pub steps: Vec<MicroLessonStep>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_calibration: Option<bool>,
}

impl MicroLesson {
  /// Structural check applied to generated content before it is accepted.
  pub fn validate(&self) -> Result<(), String> {
    if self.steps.is_empty() {
      return Err("lesson has no steps".into());
    }
    for (i, step) in self.steps.iter().enumerate() {
      if step.kind.is_question() && !step.has_valid_answer() {
        return Err(format!(
          "step {} ({:?}) has correctAnswerIndex {:?} outside its {} choices",
          i,
          step.kind,
          step.correct_answer_index,
          step.choices.as_ref().map(|c| c.len()).unwrap_or(0)
        ));
      }
    }
    Ok(())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanTopic {
  pub topic_id: String,
  pub topic_name: String,
  pub priority_band: String,
  #[serde(default)]
  pub reason: String,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub recommended_micro_lessons: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionFocus {
  Confidence,
  FillingGaps,
  ExamPrep,
  Mixed,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSession {
  #[serde(deserialize_with = "lenient_u32")]
  pub session_number: u32,
  pub focus: SessionFocus,
  pub topics: Vec<PlanTopic>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallStrategy {
  pub summary: String,
  pub percentage_weak_focus: f64,
  pub percentage_developing_focus: f64,
  pub percentage_review_focus: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes_for_teacher_or_parent: Option<String>,
}

impl OverallStrategy {
  pub fn total_percentage(&self) -> f64 {
    self.percentage_weak_focus + self.percentage_developing_focus + self.percentage_review_focus
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPlan {
  #[serde(deserialize_with = "lenient_u32")]
  pub plan_horizon_days: u32,
  #[serde(deserialize_with = "lenient_u32")]
  pub sessions_planned: u32,
  pub sequence: Vec<PlanSession>,
  pub overall_strategy: OverallStrategy,
  /// Unix millis; stamped by the service when the generator leaves it out.
  #[serde(default)]
  pub generated_at: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn student_profile_ignores_gamification_fields() {
    let raw = r#"{
      "id": "user-1", "name": "sam", "xp": 120, "streak": 3, "level": 2, "coins": 40,
      "learningStyle": "Hands-on", "contentPreference": "Explanation First",
      "focusMode": "High", "targetGrade": "Grade 8-9", "weakAreas": ["Algebra"]
    }"#;
    let s: StudentProfile = serde_json::from_str(raw).unwrap();
    assert_eq!(s.learning_style, LearningStyle::HandsOn);
    assert_eq!(s.content_preference, ContentPreference::ExplanationFirst);
    assert_eq!(s.focus_mode, Band::High);
    assert_eq!(s.confidence_level, None);
    assert_eq!(s.lesson_tier(), "Higher");
    assert_eq!(s.plan_tier(), "higher");
  }

  #[test]
  fn tiers_differ_for_grade_six_to_seven() {
    let raw = r#"{"id":"u","name":"n","learningStyle":"Visual","contentPreference":"Example First","targetGrade":"6-7"}"#;
    let s: StudentProfile = serde_json::from_str(raw).unwrap();
    assert_eq!(s.lesson_tier(), "Higher");
    assert_eq!(s.plan_tier(), "foundation");
  }

  #[test]
  fn step_kind_uses_kebab_case_tags() {
    let step: MicroLessonStep =
      serde_json::from_str(r#"{"id":"s","type":"worked-example","content":"x"}"#).unwrap();
    assert_eq!(step.kind, StepKind::WorkedExample);
    let out = serde_json::to_value(&step).unwrap();
    assert_eq!(out["type"], "worked-example");
    assert!(out.get("choices").is_none());
  }

  #[test]
  fn validate_rejects_out_of_range_answer() {
    let mut q = MicroLessonStep::new("q", StepKind::Practice);
    q.choices = Some(vec!["a".into(), "b".into()]);
    q.correct_answer_index = Some(2);
    let lesson = MicroLesson {
      id: "l".into(),
      topic_id: "t".into(),
      title: "T".into(),
      estimated_minutes: 5,
      steps: vec![q],
      is_calibration: None,
    };
    assert!(lesson.validate().is_err());
  }

  #[test]
  fn validate_rejects_empty_lesson() {
    let lesson = MicroLesson {
      id: "l".into(),
      topic_id: "t".into(),
      title: "T".into(),
      estimated_minutes: 5,
      steps: vec![],
      is_calibration: None,
    };
    assert!(lesson.validate().is_err());
  }

  #[test]
  fn generated_numbers_may_be_written_as_floats() {
    let lesson: MicroLesson = serde_json::from_str(
      r#"{"title":"T","estimatedMinutes":5.0,
          "steps":[{"type":"practice","choices":["a","b"],"correctAnswerIndex":1.0}]}"#,
    )
    .unwrap();
    assert_eq!(lesson.estimated_minutes, 5);
    assert_eq!(lesson.steps[0].correct_answer_index, Some(1));
    assert!(lesson.validate().is_ok());

    let strategy: OverallStrategy = serde_json::from_str(
      r#"{"summary":"s","percentageWeakFocus":33.5,"percentageDevelopingFocus":33.5,"percentageReviewFocus":33}"#,
    )
    .unwrap();
    assert!((strategy.total_percentage() - 100.0).abs() < 1e-9);
  }

  #[test]
  fn fractional_or_negative_numbers_are_rejected() {
    let half_index = r#"{"title":"T","steps":[{"type":"practice","choices":["a","b"],"correctAnswerIndex":0.5}]}"#;
    assert!(serde_json::from_str::<MicroLesson>(half_index).is_err());
    let negative = r#"{"title":"T","estimatedMinutes":-3,"steps":[]}"#;
    assert!(serde_json::from_str::<MicroLesson>(negative).is_err());
  }
}
