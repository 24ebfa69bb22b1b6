use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::model::{AnswerRecord, Difficulty};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStatusError {
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

/// Lifecycle of one attempt. Transitions only move forward:
/// `NotStarted -> InProgress -> Completed | Abandoned`, and an attempt that
/// never started may be abandoned directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::InProgress | Self::Abandoned)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Abandoned)
        )
    }

    /// Returns the next status if the move is allowed.
    ///
    /// # Errors
    ///
    /// Returns `SessionStatusError::InvalidTransition` for backward or skipping moves.
    pub fn transition(self, next: Self) -> Result<Self, SessionStatusError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SessionStatusError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        };
        f.write_str(label)
    }
}

/// Why a session reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The student submitted.
    Submitted,
    /// The countdown reached zero.
    TimeExpired,
    /// The scoring service reported the test as finished.
    ServiceCompleted,
}

/// Final result of a completed attempt. Produced exactly once per session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub score: u8,
    pub total_questions: usize,
    pub answered: usize,
    pub answers: AnswerRecord,
    pub time_spent_secs: u32,
    pub tab_switches: u32,
    pub warnings: usize,
    pub flagged: bool,
    pub ability_estimate: Option<f64>,
    pub difficulty: Option<Difficulty>,
    pub reason: CompletionReason,
    pub completed_at: DateTime<Utc>,
}

/// Percentage score rounded to the nearest integer. Zero when `total` is zero.
#[must_use]
pub fn percent_score(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    // Rounds half up: (200 * c + t) / (2 * t).
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Score derived from an ability estimate in `[0, 1]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ability_score(ability: f64) -> u8 {
    if !ability.is_finite() {
        return 0;
    }
    (ability * 100.0).round().clamp(0.0, 100.0) as u8
}
