//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{LearningPlan, MicroLesson, StudentProfile, Topic};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GenerateLesson(LessonIn),
    GeneratePlan(PlanIn),
    TutorMessage(TutorIn),
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Lesson(LessonOut),
    Plan(PlanOut),
    TutorReply(TutorOut),
    Error { message: String },
}

//
// Shared request/response DTOs
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonIn {
    pub topic_id: String,
    pub topic_title: String,
    pub student: StudentProfile,
    #[serde(default)]
    pub is_calibration: bool,
}

#[derive(Debug, Serialize)]
pub struct LessonOut {
    pub lesson: MicroLesson,
    /// "generated" | "cached" | "fallback"
    pub outcome: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct PlanIn {
    pub student: StudentProfile,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

#[derive(Debug, Serialize)]
pub struct PlanOut {
    pub plan: Option<LearningPlan>,
    /// "generated" | "cached" | "absent"
    pub outcome: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorIn {
    pub student_name: String,
    #[serde(default)]
    pub context: String,
    pub question: String,
    pub learning_style: String,
}

#[derive(Debug, Serialize)]
pub struct TutorOut {
    pub text: String,
    /// "generated" | "unavailable"
    pub outcome: &'static str,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generator: bool,
}
