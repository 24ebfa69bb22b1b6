use serde::Serialize;
use std::collections::HashMap;

use crate::model::{Question, QuestionId};

/// Selected option per question. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerRecord {
    answers: HashMap<QuestionId, usize>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `option` for `question`, returning the previous selection if any.
    pub fn set(&mut self, question: QuestionId, option: usize) -> Option<usize> {
        self.answers.insert(question, option)
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<usize> {
        self.answers.get(question).copied()
    }

    /// Forget the selection for `question`, returning it if there was one.
    pub fn remove(&mut self, question: &QuestionId) -> Option<usize> {
        self.answers.remove(question)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, usize)> {
        self.answers.iter().map(|(id, option)| (id, *option))
    }

    /// Number of questions answered with their keyed correct option.
    #[must_use]
    pub fn correct_count(&self, questions: &[Question]) -> usize {
        questions
            .iter()
            .filter(|q| {
                self.get(q.id())
                    .and_then(|selected| q.is_correct(selected))
                    .unwrap_or(false)
            })
            .count()
    }
}
