//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use skilltwin_core::model::{QuestionError, QuestionId, SessionStatusError, SettingsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the REST client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
    #[error("service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("not signed in or the session has expired")]
    Unauthorized,
    #[error("unexpected response from service: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the failure never reached the service.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<QuestionError> for ApiError {
    fn from(err: QuestionError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors emitted by the timed session controller and its driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session has not started")]
    NotStarted,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session already completed")]
    Completed,
    #[error("session was exited")]
    Abandoned,
    #[error("a request is already in flight")]
    Busy,
    #[error("no question is displayed")]
    NoQuestion,
    #[error("question {0} is not the one being displayed")]
    NotDisplayed(QuestionId),
    #[error("option {option} does not exist for question {question}")]
    InvalidOption { question: QuestionId, option: usize },
    #[error("no answer selected for the current question")]
    NoAnswer,
    #[error("operation is not available for this kind of session")]
    Unsupported,
    #[error("session driver has stopped")]
    DriverStopped,
    #[error(transparent)]
    Status(#[from] SessionStatusError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted while loading a static question set.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("question set has no questions")]
    Empty,
    #[error("malformed question set: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Errors emitted by `AppContext`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContextError {
    #[error("application context lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("name is required")]
    MissingName,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Errors emitted by `InsightService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InsightError {
    #[error("no student selected; sign in or pass a student id")]
    NoStudent,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted by `PaperService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PaperError {
    #[error("only PDF files are supported: {0}")]
    NotPdf(PathBuf),
    #[error("file is empty: {0}")]
    EmptyFile(PathBuf),
    #[error("paper text is empty")]
    EmptyText,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
