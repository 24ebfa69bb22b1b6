use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::StudentProfile;

/// Student dashboard as assembled by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dashboard {
    pub student: Option<StudentProfile>,
    pub stats: DashboardStats,
    pub upcoming_exams: Vec<UpcomingExam>,
    pub recent_tests: Vec<RecentTest>,
    pub weak_topics: Vec<WeakTopic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub overall_mastery: f64,
    pub questions_attempted: u32,
    pub accuracy_rate: f64,
    /// Hours.
    pub total_study_time: f64,
    pub streak_days: u32,
    pub weekly_goal_progress: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpcomingExam {
    pub subject: String,
    pub date: String,
    pub topic: String,
    pub preparedness: f64,
    pub days_left: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentTest {
    pub id: String,
    pub subject: String,
    pub test_type: Option<String>,
    pub total_score: Option<f64>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// One attempt from the student's test history, newest first on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRecord {
    pub id: String,
    pub subject: String,
    pub test_type: Option<String>,
    pub ability_estimate: Option<f64>,
    pub total_score: Option<f64>,
    /// Seconds.
    pub time_taken: Option<u32>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl TestRecord {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeakTopic {
    pub topic: String,
    pub subject: String,
    pub mastery: f64,
    pub accuracy: f64,
    pub questions_attempted: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Risk bucket for a predicted score: >= 80 low, >= 60 medium, else high.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Low
        } else if score >= 60.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictedScore {
    pub predicted_score: f64,
    pub confidence_interval: Option<(f64, f64)>,
    pub confidence: Option<f64>,
}

/// Score prediction with its risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: PredictedScore,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub weak_topics: Vec<WeakTopic>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub improvement_tips: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningKind {
    Video,
    Notes,
    Quiz,
    Practice,
    MockTest,
    #[serde(other)]
    Other,
}

impl fmt::Display for LearningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Video => "video",
            Self::Notes => "notes",
            Self::Quiz => "quiz",
            Self::Practice => "practice",
            Self::MockTest => "mock test",
            Self::Other => "activity",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// A suggested study activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningItem {
    #[serde(rename = "type")]
    pub kind: LearningKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub questions: Option<u32>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Recommendations with the student's daily and weekly goals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningPlan {
    pub recommendations: Vec<LearningItem>,
    pub daily_goal: Option<String>,
    pub progress_today: Option<String>,
    pub weekly_progress: Option<String>,
}

impl LearningPlan {
    /// Items ordered high priority first, keeping the service's order within
    /// a priority.
    #[must_use]
    pub fn by_priority(&self) -> Vec<&LearningItem> {
        let mut items: Vec<_> = self.recommendations.iter().collect();
        items.sort_by_key(|item| item.priority);
        items
    }
}
