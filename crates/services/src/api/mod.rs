//! Contracts for the remote scoring, analysis and account service.
//!
//! Each concern gets its own trait so callers (and test fakes) only depend
//! on what they use. [`HttpApi`] implements all of them over REST.

mod client;
pub(crate) mod wire;

use async_trait::async_trait;
use serde::Serialize;

use skilltwin_core::model::{
    AdaptiveStart, AdaptiveStartRequest, AnswerFeedback, AnswerSubmission, Dashboard, Identity,
    LearningPlan, PaperAnalysis, Prediction, StudentId, StudentProfile, TestRecord,
};

use crate::error::ApiError;

pub use client::HttpApi;

/// Adaptive test endpoints driven by a timed session.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Open an adaptive attempt and fetch its first question.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn start_adaptive(
        &self,
        request: &AdaptiveStartRequest,
    ) -> Result<AdaptiveStart, ApiError>;

    /// Send one answer and receive the verdict plus the next question.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn submit_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<AnswerFeedback, ApiError>;
}

/// Sign-in and registration.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, other variants
    /// for transport or service failures.
    async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with status 409 when the email is taken.
    async fn register(&self, registration: &Registration) -> Result<Registered, ApiError>;
}

/// Dashboard, prediction and health reads.
#[async_trait]
pub trait InsightApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn dashboard(&self, student: &StudentId) -> Result<Dashboard, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn prediction(&self, student: &StudentId) -> Result<Prediction, ApiError>;

    /// Recent attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn test_history(&self, student: &StudentId) -> Result<Vec<TestRecord>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn recommendations(&self, student: &StudentId) -> Result<LearningPlan, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the service cannot be reached or answers
    /// with something other than a health document.
    async fn health(&self) -> Result<HealthStatus, ApiError>;
}

/// Question-paper analysis.
#[async_trait]
pub trait PaperApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn analyze_paper_file(&self, upload: PaperUpload) -> Result<PaperAnalysis, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or service rejection.
    async fn analyze_paper_text(
        &self,
        text: &str,
        student: Option<&StudentId>,
    ) -> Result<PaperAnalysis, ApiError>;
}

/// New-account details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
}

/// Result of registering. The service may or may not sign the student in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub profile: StudentProfile,
    pub token: Option<String>,
}

/// A PDF read into memory, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub student: Option<StudentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    pub version: Option<String>,
    pub database: Option<String>,
    pub timestamp: Option<String>,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
