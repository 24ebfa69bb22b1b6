mod adaptive;
mod analysis;
mod answer;
mod ids;
mod insight;
mod integrity;
mod profile;
mod question;
mod session;
mod settings;

pub use ids::{QuestionId, SessionId, StudentId};

pub use adaptive::{AdaptiveStart, AdaptiveStartRequest, AnswerFeedback, AnswerSubmission};
pub use analysis::{
    PaperAnalysis, PaperMetadata, ScorePrediction, StudyDay, StudyPlan, TopicRecommendation,
};
pub use answer::AnswerRecord;
pub use insight::{
    Dashboard, DashboardStats, LearningItem, LearningKind, LearningPlan, PredictedScore,
    Prediction, Priority, RecentTest, RiskLevel, TestRecord, UpcomingExam, WeakTopic,
};
pub use integrity::{FLAG_AFTER_TAB_SWITCHES, IntegrityEvent, IntegrityKind, IntegrityLog};
pub use profile::{Identity, StudentProfile, Theme};
pub use question::{Difficulty, MAX_OPTIONS, Question, QuestionError, option_index, option_label};
pub use session::{
    CompletionReason, SessionOutcome, SessionStatus, SessionStatusError, ability_score,
    percent_score,
};
pub use settings::{
    ClientSettings, ClientSettingsDraft, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS,
    SettingsError,
};
