use std::sync::Arc;

use skilltwin_core::model::{Dashboard, LearningPlan, Prediction, StudentId, TestRecord};

use crate::api::{HealthStatus, InsightApi};
use crate::context::AppContext;
use crate::error::InsightError;

/// Read-only views of a student's progress.
#[derive(Clone)]
pub struct InsightService {
    api: Arc<dyn InsightApi>,
    context: AppContext,
}

impl InsightService {
    #[must_use]
    pub fn new(api: Arc<dyn InsightApi>, context: AppContext) -> Self {
        Self { api, context }
    }

    /// Dashboard for `student`, or for the signed-in student when `None`.
    ///
    /// # Errors
    ///
    /// Returns `InsightError::NoStudent` when no student can be resolved, or
    /// `InsightError::Api` if the request fails.
    pub async fn dashboard(&self, student: Option<&StudentId>) -> Result<Dashboard, InsightError> {
        let student = self.resolve(student)?;
        Ok(self.api.dashboard(&student).await?)
    }

    /// # Errors
    ///
    /// Returns `InsightError::NoStudent` when no student can be resolved, or
    /// `InsightError::Api` if the request fails.
    pub async fn prediction(
        &self,
        student: Option<&StudentId>,
    ) -> Result<Prediction, InsightError> {
        let student = self.resolve(student)?;
        Ok(self.api.prediction(&student).await?)
    }

    /// Past attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `InsightError::NoStudent` when no student can be resolved, or
    /// `InsightError::Api` if the request fails.
    pub async fn test_history(
        &self,
        student: Option<&StudentId>,
    ) -> Result<Vec<TestRecord>, InsightError> {
        let student = self.resolve(student)?;
        let tests = self.api.test_history(&student).await?;
        tracing::debug!(student = %student, tests = tests.len(), "loaded test history");
        Ok(tests)
    }

    /// # Errors
    ///
    /// Returns `InsightError::NoStudent` when no student can be resolved, or
    /// `InsightError::Api` if the request fails.
    pub async fn recommendations(
        &self,
        student: Option<&StudentId>,
    ) -> Result<LearningPlan, InsightError> {
        let student = self.resolve(student)?;
        Ok(self.api.recommendations(&student).await?)
    }

    /// # Errors
    ///
    /// Returns `InsightError::Api` if the service cannot be reached.
    pub async fn health(&self) -> Result<HealthStatus, InsightError> {
        let health = self.api.health().await?;
        if !health.is_healthy() {
            tracing::warn!(status = %health.status, database = ?health.database, "service degraded");
        }
        Ok(health)
    }

    fn resolve(&self, student: Option<&StudentId>) -> Result<StudentId, InsightError> {
        student
            .cloned()
            .or_else(|| self.context.student_id())
            .ok_or(InsightError::NoStudent)
    }
}
