use std::sync::Arc;

use storage::repository::Storage;

use crate::api::HttpApi;
use crate::auth_service::AuthService;
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppServicesError;
use crate::insight_service::InsightService;
use crate::paper_service::PaperService;
use crate::sessions::{ScreenMonitor, SessionDriver};
use crate::Clock;

/// Assembles app-facing services around one context and one REST client.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    context: AppContext,
    api: Arc<HttpApi>,
    auth: Arc<AuthService>,
    insights: Arc<InsightService>,
    papers: Arc<PaperService>,
}

impl AppServices {
    /// Build services backed by `SQLite` profile storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the configuration is invalid or storage
    /// or the HTTP client cannot be initialized.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        Self::with_storage(config, storage, clock).await
    }

    /// Build services over an existing storage backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the configuration is invalid, the stored
    /// profile cannot be read, or the HTTP client cannot be built.
    pub async fn with_storage(
        config: &AppConfig,
        storage: Storage,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let settings = config.settings()?;
        let context = AppContext::load(Arc::clone(&storage.profiles)).await?;
        let api = Arc::new(HttpApi::new(settings, context.clone())?);
        tracing::debug!(api = api.settings().api_base_url(), "services ready");

        let auth = Arc::new(AuthService::new(api.clone(), context.clone()));
        let insights = Arc::new(InsightService::new(api.clone(), context.clone()));
        let papers = Arc::new(PaperService::new(api.clone(), context.clone()));

        Ok(Self {
            clock,
            context,
            api,
            auth,
            insights,
            papers,
        })
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn context(&self) -> AppContext {
        self.context.clone()
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn insights(&self) -> Arc<InsightService> {
        Arc::clone(&self.insights)
    }

    #[must_use]
    pub fn papers(&self) -> Arc<PaperService> {
        Arc::clone(&self.papers)
    }

    /// Driver that runs timed sessions against the configured service.
    #[must_use]
    pub fn session_driver(&self, monitor: Arc<dyn ScreenMonitor>) -> SessionDriver {
        SessionDriver::new(self.api.clone(), monitor)
    }
}
