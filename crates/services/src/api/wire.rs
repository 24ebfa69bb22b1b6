//! JSON shapes exchanged with the backend.

use serde::{Deserialize, Serialize};

use skilltwin_core::model::{
    AdaptiveStart, AnswerFeedback, Dashboard, Difficulty, PaperAnalysis, Question, QuestionId,
    SessionId, StudentId, StudentProfile, TestRecord, option_index,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct WireQuestion {
    id: QuestionId,
    question_text: String,
    options: Vec<String>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

impl TryFrom<WireQuestion> for Question {
    type Error = ApiError;

    fn try_from(wire: WireQuestion) -> Result<Self, Self::Error> {
        let id = wire.id.clone();
        let mut question = Question::new(wire.id, wire.question_text, wire.options)
            .map_err(|err| ApiError::Decode(format!("question {id}: {err}")))?
            .with_subject(wire.subject)
            .with_topic(wire.topic)
            .with_difficulty(wire.difficulty.and_then(|raw| raw.parse::<Difficulty>().ok()));

        if let Some(explanation) = wire.explanation {
            question = question.with_explanation(explanation);
        }

        // Answer keys are informational for adaptive questions; a key that
        // does not name an option is dropped rather than failing the question.
        if let Some(index) = wire.correct_answer.as_deref().and_then(option_index) {
            if question.has_option(index) {
                question = question.with_correct_option(index)?;
            } else {
                tracing::debug!(question = %id, index, "ignoring out-of-range answer key");
            }
        }

        Ok(question)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartRequest<'a> {
    pub student_id: &'a StudentId,
    pub subject: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartResponse {
    test_id: SessionId,
    question: WireQuestion,
    #[serde(default = "first_question")]
    question_number: u32,
    #[serde(default = "default_total")]
    total_questions: u32,
    #[serde(default)]
    ability_estimate: Option<f64>,
    #[serde(default)]
    time_limit: Option<u32>,
}

fn first_question() -> u32 {
    1
}

fn default_total() -> u32 {
    10
}

impl TryFrom<StartResponse> for AdaptiveStart {
    type Error = ApiError;

    fn try_from(wire: StartResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            session_id: wire.test_id,
            question: wire.question.try_into()?,
            question_number: wire.question_number,
            total_questions: wire.total_questions,
            ability_estimate: wire.ability_estimate,
            time_limit_secs: wire.time_limit,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequest<'a> {
    pub test_id: &'a SessionId,
    pub question_id: &'a QuestionId,
    pub answer: String,
    pub response_time: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    ability_estimate: f64,
    #[serde(default)]
    test_completed: bool,
    #[serde(default)]
    next_question: Option<WireQuestion>,
    #[serde(default)]
    correct: Option<bool>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    final_score: Option<f64>,
    #[serde(default)]
    questions_completed: Option<u32>,
}

impl TryFrom<SubmitResponse> for AnswerFeedback {
    type Error = ApiError;

    fn try_from(wire: SubmitResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            ability_estimate: wire.ability_estimate,
            test_completed: wire.test_completed,
            next_question: wire.next_question.map(Question::try_from).transpose()?,
            correct: wire.correct,
            explanation: wire.explanation.filter(|text| !text.trim().is_empty()),
            final_score: wire.final_score,
            questions_completed: wire.questions_completed,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuickAnalyzeRequest<'a> {
    pub paper_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<&'a StudentId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalysisEnvelope {
    pub analysis: PaperAnalysis,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DashboardEnvelope {
    pub dashboard: Dashboard,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryEnvelope {
    #[serde(default)]
    pub tests: Vec<TestRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub user: StudentProfile,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}
