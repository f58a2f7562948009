//! Offline lesson served whenever live generation is unavailable or unparsable.
//! Built locally, so it never fails and never touches the network.

use crate::domain::{MicroLesson, MicroLessonStep, StepKind};

pub const OFFLINE_SUFFIX: &str = "(Offline Mode)";

/// Static "blurting" revision lesson for the given topic.
pub fn fallback_lesson(topic_id: &str, topic_title: &str) -> MicroLesson {
  let mut diagnostic = MicroLessonStep::new("f-1", StepKind::Diagnostic);
  diagnostic.prompt = Some(format!(
    "We are currently experiencing high traffic (AI Brain Cooling Down). How confident do you feel about {} right now?",
    topic_title
  ));
  diagnostic.choices = Some(strings(&["Not confident", "A little bit", "Pretty confident", "Expert"]));
  diagnostic.correct_answer_index = Some(2);
  diagnostic.explanation =
    Some("Self-reflection is the first step to mastery. We'll get the AI back online shortly.".into());

  let mut explanation = MicroLessonStep::new("f-2", StepKind::Explanation);
  explanation.content = Some(format!(
    "**Offline Study Mode**\n\nSince we can't generate a fresh lesson right now, let's use the **'Blurting'** technique.\n\n\
     1. Grab a piece of paper.\n2. Write down EVERYTHING you know about **{}** in 2 minutes.\n\
     3. Check your notes to see what you missed.\n\nActive recall builds stronger memory pathways than just reading!",
    topic_title
  ));
  explanation.video_title = Some("Focus Music (Lofi Beats)".into());
  explanation.video_url = Some("https://www.youtube.com/watch?v=jfKfPfyJRdk".into());
  explanation.video_explanation =
    Some("Here is some background music to help you focus on your revision notes while we reconnect.".into());

  let mut practice = MicroLessonStep::new("f-3", StepKind::Practice);
  practice.prompt = Some("Did you manage to write down at least 3 key facts about this topic?".into());
  practice.choices = Some(strings(&["Yes, I did!", "No, I struggled", "I didn't try"]));
  practice.correct_answer_index = Some(0);
  practice.explanation = Some("Even struggling to remember helps your brain learn better next time.".into());

  let mut summary = MicroLessonStep::new("f-4", StepKind::Summary);
  summary.content = Some(
    "Great effort staying productive even when the tech was slow. Try reloading in a few minutes for a full AI lesson."
      .into(),
  );

  MicroLesson {
    id: format!("fallback-{}", topic_id),
    topic_id: topic_id.to_string(),
    title: format!("{} {}", topic_title, OFFLINE_SUFFIX),
    estimated_minutes: 3,
    steps: vec![diagnostic, explanation, practice, summary],
    is_calibration: None,
  }
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}
