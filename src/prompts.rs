//! Prompt construction for lessons, tutor replies and learning plans.
//! Templates come from `config::Prompts`; this module picks the branch and fills them.

use serde_json::json;

use crate::cache::LessonMode;
use crate::config::Prompts;
use crate::domain::{Band, ContentPreference, LearningStyle, StudentProfile, Topic};
use crate::generator::GenerationRequest;
use crate::util::fill_template;

const CALIBRATION_FLOW: &str = "1. Diagnostic Q1 2. Diagnostic Q2 3. Diagnostic Q3 4. Diagnostic Q4 5. Diagnostic Q5 6. Summary: \"Baseline Established\".";
const EXAMPLE_FIRST_FLOW: &str = "1. Diagnostic 2. Worked Example 3. Explanation 4. Practice 1 5. Practice 2 6. Summary";
const EXPLANATION_FIRST_FLOW: &str = "1. Diagnostic 2. Explanation 3. Worked Example 4. Practice 1 5. Practice 2 6. Summary";
const DEFAULT_WEAK_AREAS: &str = "General Maths";
const EXAM_BOARD: &str = "AQA";

/// Lesson request: calibration asks for five diagnostics and never searches;
/// standard mode orders explanation/worked example by content preference and
/// enables search with terms biased by learning style.
pub fn lesson_request(
  prompts: &Prompts,
  topic_id: &str,
  topic_title: &str,
  student: &StudentProfile,
  mode: LessonMode,
) -> GenerationRequest {
  let (task_context, search_step, flow) = match mode {
    LessonMode::Calibration => {
      let weak_areas = student
        .weak_areas
        .as_ref()
        .filter(|w| !w.is_empty())
        .map(|w| w.join(", "))
        .unwrap_or_else(|| DEFAULT_WEAK_AREAS.to_string());
      let ctx = fill_template(&prompts.calibration_context, &[("topic_title", topic_title), ("weak_areas", &weak_areas)]);
      (ctx, "Skip.".to_string(), CALIBRATION_FLOW)
    }
    LessonMode::Standard => {
      let ctx = fill_template(
        &prompts.standard_context,
        &[
          ("topic_title", topic_title),
          ("student_name", &student.name),
          ("tier", student.lesson_tier()),
          ("style", student.learning_style.as_str()),
        ],
      );
      let search_tpl = match student.learning_style {
        LearningStyle::Visual => &prompts.visual_search,
        _ => &prompts.verbal_search,
      };
      let search = fill_template(search_tpl, &[("topic_title", topic_title)]);
      let flow = match student.content_preference {
        ContentPreference::ExampleFirst => EXAMPLE_FIRST_FLOW,
        ContentPreference::ExplanationFirst => EXPLANATION_FIRST_FLOW,
      };
      (ctx, format!("Use googleSearch. {}", search), flow)
    }
  };

  let is_calibration = if mode == LessonMode::Calibration { "true" } else { "false" };
  let prompt = fill_template(
    &prompts.lesson_template,
    &[
      ("task_context", &task_context),
      ("search_step", &search_step),
      ("topic_id", topic_id),
      ("topic_title", topic_title),
      ("is_calibration", is_calibration),
      ("flow", flow),
    ],
  );
  GenerationRequest::new(prompt).with_search(mode == LessonMode::Standard)
}

pub fn tutor_request(
  prompts: &Prompts,
  student_name: &str,
  context: &str,
  question: &str,
  learning_style: &str,
) -> GenerationRequest {
  let prompt = fill_template(
    &prompts.tutor_template,
    &[
      ("student_name", student_name),
      ("learning_style", learning_style),
      ("context", context),
      ("question", question),
    ],
  );
  GenerationRequest::new(prompt)
}

/// Compact JSON summary of the student and their topics, embedded in the plan prompt.
pub fn plan_student_data(student: &StudentProfile, topics: &[Topic]) -> serde_json::Value {
  json!({
    "board": EXAM_BOARD,
    "tier": student.plan_tier(),
    "learningStyle": student.learning_style.as_str(),
    "attentionMode": student.focus_mode.as_lower(),
    "anxietyLevel": student.confidence_level.unwrap_or(Band::Medium).as_lower(),
    "topics": topics.iter().map(|t| json!({
      "id": t.id,
      "name": t.title,
      "group": t.category,
      "masteryPercent": t.progress,
      "masteryBand": t.mastery.as_lower(),
    })).collect::<Vec<_>>(),
  })
}

pub fn plan_request(prompts: &Prompts, student: &StudentProfile, topics: &[Topic]) -> GenerationRequest {
  let data = plan_student_data(student, topics).to_string();
  GenerationRequest::new(fill_template(&prompts.plan_template, &[("student_data", &data)]))
}
