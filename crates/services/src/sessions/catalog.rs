//! Static question sets for proctored exams.

use serde::Deserialize;

use skilltwin_core::model::{Question, QuestionError, QuestionId};

use crate::error::QuestionSetError;

pub const DEMO_SUBJECT: &str = "Adaptive Learning";

/// A named, locally scored question set.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    pub subject: String,
    pub duration_secs: Option<u32>,
    pub questions: Vec<Question>,
}

#[derive(Deserialize)]
struct QuestionSetFile {
    subject: String,
    #[serde(default)]
    duration_secs: Option<u32>,
    questions: Vec<QuestionEntry>,
}

#[derive(Deserialize)]
struct QuestionEntry {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_option: usize,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

impl QuestionSet {
    /// Parse a question set from JSON.
    ///
    /// ```json
    /// {"subject": "Physics", "duration_secs": 1800,
    ///  "questions": [{"id": 1, "text": "...", "options": ["..."], "correct_option": 0}]}
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError` for malformed JSON, an empty set, or a
    /// question that fails validation.
    pub fn from_json(raw: &str) -> Result<Self, QuestionSetError> {
        let file: QuestionSetFile = serde_json::from_str(raw)?;
        if file.questions.is_empty() {
            return Err(QuestionSetError::Empty);
        }

        let questions = file
            .questions
            .into_iter()
            .map(|entry| {
                let mut question = Question::new(entry.id, entry.text, entry.options)?
                    .with_correct_option(entry.correct_option)?
                    .with_subject(file.subject.clone());
                if let Some(topic) = entry.topic {
                    question = question.with_topic(topic);
                }
                if let Some(explanation) = entry.explanation {
                    question = question.with_explanation(explanation);
                }
                Ok(question)
            })
            .collect::<Result<Vec<_>, QuestionError>>()?;

        Ok(Self {
            subject: file.subject,
            duration_secs: file.duration_secs,
            questions,
        })
    }

    /// The built-in three-question practice exam.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` only if the built-in data is invalid.
    pub fn demo() -> Result<Self, QuestionError> {
        let entries: [(u64, &str, [&str; 4], usize); 3] = [
            (
                1,
                "What is the primary purpose of adaptive learning systems?",
                [
                    "To provide one-size-fits-all education",
                    "To personalize learning based on individual performance",
                    "To reduce instructor workload",
                    "To increase standardization",
                ],
                1,
            ),
            (
                2,
                "Which algorithm is commonly used in adaptive testing?",
                [
                    "Linear regression",
                    "Decision trees",
                    "Item Response Theory (IRT)",
                    "K-means clustering",
                ],
                2,
            ),
            (
                3,
                "What is a key benefit of personalized learning paths?",
                [
                    "Faster completion for all students",
                    "Improved learning outcomes and engagement",
                    "Reduced need for instructors",
                    "Lower costs for educational institutions",
                ],
                1,
            ),
        ];

        let questions = entries
            .into_iter()
            .map(|(id, text, options, correct)| {
                Question::new(id, text, options.map(str::to_owned).to_vec())?
                    .with_correct_option(correct)
                    .map(|q| q.with_subject(DEMO_SUBJECT))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            subject: DEMO_SUBJECT.into(),
            duration_secs: None,
            questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_set_is_keyed() {
        let set = QuestionSet::demo().unwrap();
        assert_eq!(set.questions.len(), 3);
        let keys: Vec<_> = set.questions.iter().map(Question::correct_option).collect();
        assert_eq!(keys, vec![Some(1), Some(2), Some(1)]);
    }

    #[test]
    fn parses_json_set() {
        let set = QuestionSet::from_json(
            r#"{
                "subject": "Physics", "duration_secs": 900,
                "questions": [
                    {"id": 1, "text": "Unit of force?", "options": ["Joule", "Newton"], "correct_option": 1, "topic": "Mechanics"},
                    {"id": "q2", "text": "Speed of light?", "options": ["3e8 m/s", "3e6 m/s"], "correct_option": 0}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(set.duration_secs, Some(900));
        assert_eq!(set.questions[0].topic(), "Mechanics");
        assert_eq!(set.questions[1].id(), &QuestionId::new("q2"));
        assert_eq!(set.questions[1].subject(), "Physics");
    }

    #[test]
    fn rejects_bad_sets() {
        let empty = QuestionSet::from_json(r#"{"subject": "X", "questions": []}"#);
        assert!(matches!(empty, Err(QuestionSetError::Empty)));

        let bad_key = QuestionSet::from_json(
            r#"{"subject": "X", "questions": [{"id": 1, "text": "Q", "options": ["a"], "correct_option": 3}]}"#,
        );
        assert!(matches!(bad_key, Err(QuestionSetError::Question(_))));

        assert!(matches!(
            QuestionSet::from_json("not json"),
            Err(QuestionSetError::Parse(_))
        ));
    }
}
