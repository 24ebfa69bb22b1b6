use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,

    #[error("question has no options")]
    NoOptions,

    #[error("too many options: {len}")]
    TooManyOptions { len: usize },

    #[error("correct option {index} is out of range for {len} options")]
    CorrectOptionOutOfRange { index: usize, len: usize },
}

/// Largest option set that still has single-letter labels (`A`..=`Z`).
pub const MAX_OPTIONS: usize = 26;

/// Label shown for, and sent to the service for, the option at `index`.
#[must_use]
pub fn option_label(index: usize) -> Option<char> {
    let offset = u8::try_from(index).ok().filter(|i| usize::from(*i) < MAX_OPTIONS)?;
    Some(char::from(b'A' + offset))
}

/// Parses a label such as `"b"` or `" C "` back into an option index.
#[must_use]
pub fn option_index(label: &str) -> Option<usize> {
    let mut chars = label.trim().chars();
    let first = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !first.is_ascii_uppercase() {
        return None;
    }
    Some(usize::from(first as u8 - b'A'))
}

/// Coarse difficulty bucket used by the service and for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Maps an ability estimate in `[0, 1]` onto a difficulty bucket.
    #[must_use]
    pub fn from_ability(ability: f64) -> Self {
        if ability < 0.3 {
            Self::Easy
        } else if ability < 0.7 {
            Self::Medium
        } else {
            Self::Hard
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        };
        f.write_str(label)
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(()),
        }
    }
}

/// A multiple-choice question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_option: Option<usize>,
    subject: String,
    topic: String,
    explanation: Option<String>,
    difficulty: Option<Difficulty>,
}

impl Question {
    /// Build a question from its text and ordered options.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank or the option list is empty
    /// or longer than [`MAX_OPTIONS`].
    pub fn new(
        id: impl Into<QuestionId>,
        text: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if options.len() > MAX_OPTIONS {
            return Err(QuestionError::TooManyOptions { len: options.len() });
        }
        Ok(Self {
            id: id.into(),
            text,
            options,
            correct_option: None,
            subject: String::new(),
            topic: String::new(),
            explanation: None,
            difficulty: None,
        })
    }

    /// Attach the correct option for locally scored flows.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::CorrectOptionOutOfRange` if `index` is not an option.
    pub fn with_correct_option(mut self, index: usize) -> Result<Self, QuestionError> {
        if index >= self.options.len() {
            return Err(QuestionError::CorrectOptionOutOfRange {
                index,
                len: self.options.len(),
            });
        }
        self.correct_option = Some(index);
        Ok(self)
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        self.explanation = (!explanation.trim().is_empty()).then_some(explanation);
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Option<Difficulty>) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<usize> {
        self.correct_option
    }

    /// `None` when the question carries no answer key.
    #[must_use]
    pub fn is_correct(&self, index: usize) -> Option<bool> {
        self.correct_option.map(|correct| correct == index)
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Option {i}")).collect()
    }

    #[test]
    fn rejects_empty_option_list() {
        let err = Question::new(1, "Q", Vec::new()).unwrap_err();
        assert_eq!(err, QuestionError::NoOptions);
    }

    #[test]
    fn rejects_blank_text() {
        let err = Question::new(1, "   ", options(2)).unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn correct_option_must_exist() {
        let err = Question::new(1, "Q", options(4))
            .unwrap()
            .with_correct_option(4)
            .unwrap_err();
        assert_eq!(err, QuestionError::CorrectOptionOutOfRange { index: 4, len: 4 });
    }

    #[test]
    fn is_correct_requires_answer_key() {
        let keyed = Question::new(1, "Q", options(3))
            .unwrap()
            .with_correct_option(1)
            .unwrap();
        assert_eq!(keyed.is_correct(1), Some(true));
        assert_eq!(keyed.is_correct(2), Some(false));

        let unkeyed = Question::new(2, "Q", options(3)).unwrap();
        assert_eq!(unkeyed.is_correct(1), None);
    }

    #[test]
    fn labels_map_both_ways() {
        assert_eq!(option_label(0), Some('A'));
        assert_eq!(option_label(3), Some('D'));
        assert_eq!(option_label(26), None);
        assert_eq!(option_index("b"), Some(1));
        assert_eq!(option_index(" D "), Some(3));
        assert_eq!(option_index("AB"), None);
        assert_eq!(option_index("1"), None);
        assert_eq!(option_index(""), None);
    }

    #[test]
    fn difficulty_buckets_follow_ability() {
        assert_eq!(Difficulty::from_ability(0.1), Difficulty::Easy);
        assert_eq!(Difficulty::from_ability(0.3), Difficulty::Medium);
        assert_eq!(Difficulty::from_ability(0.69), Difficulty::Medium);
        assert_eq!(Difficulty::from_ability(0.7), Difficulty::Hard);
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(Difficulty::Medium.to_string(), "Medium");
    }

    #[test]
    fn blank_explanation_is_dropped() {
        let q = Question::new(1, "Q", options(2)).unwrap().with_explanation("  ");
        assert_eq!(q.explanation(), None);
    }
}
