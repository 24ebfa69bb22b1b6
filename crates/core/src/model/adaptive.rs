use serde::Serialize;

use crate::model::{Question, QuestionId, SessionId, StudentId};

/// Request to open an adaptive attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdaptiveStartRequest {
    pub student_id: StudentId,
    pub subject: String,
}

/// First question of an adaptive attempt, as chosen by the scoring service.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveStart {
    pub session_id: SessionId,
    pub question: Question,
    pub question_number: u32,
    pub total_questions: u32,
    pub ability_estimate: Option<f64>,
    pub time_limit_secs: Option<u32>,
}

/// One answer sent to the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerSubmission {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    /// Option label (`A`, `B`, ...).
    pub answer: char,
    pub response_time_secs: u32,
}

/// Service verdict for one submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub ability_estimate: f64,
    pub test_completed: bool,
    pub next_question: Option<Question>,
    pub correct: Option<bool>,
    pub explanation: Option<String>,
    pub final_score: Option<f64>,
    pub questions_completed: Option<u32>,
}
