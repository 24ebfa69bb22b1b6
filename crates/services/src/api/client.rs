use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use skilltwin_core::model::{
    AdaptiveStart, AdaptiveStartRequest, AnswerFeedback, AnswerSubmission, ClientSettings,
    Dashboard, Identity, LearningPlan, PaperAnalysis, Prediction, StudentId, TestRecord,
};

use super::wire::{
    AnalysisEnvelope, AuthResponse, DashboardEnvelope, ErrorBody, HistoryEnvelope, LoginRequest,
    QuickAnalyzeRequest, StartRequest, StartResponse, SubmitRequest, SubmitResponse,
};
use super::{
    AccountApi, AssessmentApi, HealthStatus, InsightApi, PaperApi, PaperUpload, Registered,
    Registration,
};
use crate::context::AppContext;
use crate::error::ApiError;

/// REST client for the backend.
///
/// The bearer token is read from the context on every request. A 401 clears
/// the signed-in identity before `ApiError::Unauthorized` is returned.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    settings: ClientSettings,
    context: AppContext,
}

impl HttpApi {
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(settings: ClientSettings, context: AppContext) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs()))
            .build()?;
        Ok(Self {
            client,
            settings,
            context,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.settings.endpoint(path));
        match self.context.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        route: &'static str,
    ) -> Result<T, ApiError> {
        tracing::debug!(route, "sending request");
        let response = builder.send().await.map_err(|err| {
            tracing::warn!(route, %err, "request failed");
            ApiError::Network(err)
        })?;

        let status = response.status();
        tracing::debug!(route, status = status.as_u16(), "response received");

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(route, "credentials rejected; signing out");
            if let Err(err) = self.context.sign_out().await {
                tracing::error!(%err, "failed to clear stored identity");
            }
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = rejection_message(response).await;
            tracing::warn!(route, status = status.as_u16(), %message, "service rejected request");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| {
            tracing::warn!(route, %err, "undecodable response body");
            ApiError::Decode(err.to_string())
        })
    }
}

async fn rejection_message(response: Response) -> String {
    let status = response.status();
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned()
    };
    match response.bytes().await {
        Ok(body) => serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(fallback),
        Err(_) => fallback(),
    }
}

#[async_trait]
impl AssessmentApi for HttpApi {
    async fn start_adaptive(
        &self,
        request: &AdaptiveStartRequest,
    ) -> Result<AdaptiveStart, ApiError> {
        let builder = self
            .request(Method::POST, "/tests/adaptive/start")
            .json(&StartRequest {
                student_id: &request.student_id,
                subject: &request.subject,
            });
        let response: StartResponse = self.send(builder, "tests/adaptive/start").await?;
        response.try_into()
    }

    async fn submit_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<AnswerFeedback, ApiError> {
        let builder = self
            .request(Method::POST, "/tests/adaptive/submit")
            .json(&SubmitRequest {
                test_id: &submission.session_id,
                question_id: &submission.question_id,
                answer: submission.answer.to_string(),
                response_time: submission.response_time_secs,
            });
        let response: SubmitResponse = self.send(builder, "tests/adaptive/submit").await?;
        response.try_into()
    }
}

#[async_trait]
impl AccountApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/login")
            .json(&LoginRequest { email, password });
        let response: AuthResponse = self.send(builder, "auth/login").await?;
        let token = response
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Decode("login response carried no token".into()))?;
        Ok(Identity::new(response.user, token))
    }

    async fn register(&self, registration: &Registration) -> Result<Registered, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/register")
            .json(registration);
        let response: AuthResponse = self.send(builder, "auth/register").await?;
        Ok(Registered {
            profile: response.user,
            token: response.token.filter(|token| !token.is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[async_trait]
impl InsightApi for HttpApi {
    async fn dashboard(&self, student: &StudentId) -> Result<Dashboard, ApiError> {
        let builder = self.request(Method::GET, &format!("/dashboard/{student}"));
        let response: DashboardEnvelope = self.send(builder, "dashboard").await?;
        Ok(response.dashboard)
    }

    async fn prediction(&self, student: &StudentId) -> Result<Prediction, ApiError> {
        let builder = self.request(Method::GET, &format!("/performance/predict/{student}"));
        self.send(builder, "performance/predict").await
    }

    async fn test_history(&self, student: &StudentId) -> Result<Vec<TestRecord>, ApiError> {
        let builder = self.request(Method::GET, &format!("/tests/history/{student}"));
        let response: HistoryEnvelope = self.send(builder, "tests/history").await?;
        Ok(response.tests)
    }

    async fn recommendations(&self, student: &StudentId) -> Result<LearningPlan, ApiError> {
        let builder = self.request(Method::GET, &format!("/recommendations/{student}"));
        self.send(builder, "recommendations").await
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let builder = self.request(Method::GET, "/health");
        let response: HealthResponse = self.send(builder, "health").await?;
        Ok(HealthStatus {
            status: response.status,
            version: response.version,
            database: response.database,
            timestamp: response.timestamp,
        })
    }
}

#[async_trait]
impl PaperApi for HttpApi {
    async fn analyze_paper_file(&self, upload: PaperUpload) -> Result<PaperAnalysis, ApiError> {
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/pdf")?;
        let mut form = Form::new().part("file", part);
        if let Some(student) = upload.student {
            form = form.text("student_id", student.to_string());
        }
        let builder = self.request(Method::POST, "/papers/upload").multipart(form);
        let response: AnalysisEnvelope = self.send(builder, "papers/upload").await?;
        Ok(response.analysis)
    }

    async fn analyze_paper_text(
        &self,
        text: &str,
        student: Option<&StudentId>,
    ) -> Result<PaperAnalysis, ApiError> {
        let builder = self
            .request(Method::POST, "/papers/quick-analyze")
            .json(&QuickAnalyzeRequest {
                paper_text: text,
                student_id: student,
            });
        let response: AnalysisEnvelope = self.send(builder, "papers/quick-analyze").await?;
        Ok(response.analysis)
    }
}
