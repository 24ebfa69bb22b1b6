#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod auth_service;
pub mod config;
pub mod context;
pub mod error;
pub mod insight_service;
pub mod paper_service;
pub mod sessions;

pub use skilltwin_core::Clock;

pub use api::{
    AccountApi, AssessmentApi, HealthStatus, HttpApi, InsightApi, PaperApi, PaperUpload,
    Registered, Registration,
};
pub use app_services::AppServices;
pub use auth_service::AuthService;
pub use config::AppConfig;
pub use context::{AppContext, ClientState};
pub use error::{
    ApiError, AppServicesError, AuthError, ContextError, InsightError, PaperError,
    QuestionSetError, SessionError,
};
pub use insight_service::InsightService;
pub use paper_service::PaperService;

pub use sessions::{
    AdaptiveConfig, ExamConfig, QuestionSet, ScreenMonitor, SessionDriver, SessionHandle,
    SessionReport, SessionSnapshot, TimedSession, TimerScope,
};
