use skilltwin_core::model::{Difficulty, Question, SessionId, SessionOutcome, SessionStatus};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Fixed question set scored locally, usually proctored.
    Exam,
    /// Questions chosen one at a time by the scoring service.
    Adaptive,
}

/// Service verdict on the last submitted adaptive answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub correct: Option<bool>,
    pub explanation: Option<String>,
}

/// Everything a front end needs to render the current state of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub session_id: Option<SessionId>,
    pub subject: String,
    pub question: Option<Question>,
    /// Zero-based position of `question`.
    pub index: usize,
    pub total: usize,
    pub selected: Option<usize>,
    pub remaining_secs: u32,
    /// A request to the scoring service is in flight.
    pub loading: bool,
    pub ability_estimate: Option<f64>,
    pub difficulty: Option<Difficulty>,
    pub last_verdict: Option<AnswerVerdict>,
    pub latest_warning: Option<String>,
    pub tab_switches: u32,
    pub warnings: usize,
    pub flagged: bool,
    pub progress: SessionProgress,
    pub outcome: Option<SessionOutcome>,
    /// Last service failure, cleared when the next request is issued.
    pub last_error: Option<String>,
}
