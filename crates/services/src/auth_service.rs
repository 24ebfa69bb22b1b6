use std::sync::Arc;

use skilltwin_core::model::Identity;

use crate::api::{AccountApi, Registered, Registration};
use crate::context::AppContext;
use crate::error::{ApiError, AuthError};

/// Signs students in and out, keeping the application context current.
#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn AccountApi>,
    context: AppContext,
}

impl AuthService {
    #[must_use]
    pub fn new(api: Arc<dyn AccountApi>, context: AppContext) -> Self {
        Self { api, context }
    }

    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.context.snapshot().identity.clone()
    }

    /// Exchange credentials for an identity and store it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input,
    /// `AuthError::Api(ApiError::Unauthorized)` for rejected credentials, or
    /// other variants when the service or the profile store fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let identity = self.api.login(email, password).await?;
        self.context.sign_in(identity.clone()).await?;
        tracing::info!(student = %identity.student_id(), "signed in");
        Ok(identity)
    }

    /// Create an account. When the service also issues a token the student is
    /// signed in straight away.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` for blank input, a taken email
    /// (`ApiError::Rejected` with status 409), or storage failures.
    pub async fn register(&self, registration: Registration) -> Result<Registered, AuthError> {
        if registration.email.trim().is_empty() || registration.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if registration.name.trim().is_empty() {
            return Err(AuthError::MissingName);
        }

        let registered = self.api.register(&registration).await?;
        if let Some(token) = &registered.token {
            self.context
                .sign_in(Identity::new(registered.profile.clone(), token.clone()))
                .await?;
        }
        tracing::info!(
            student = %registered.profile.id,
            signed_in = registered.token.is_some(),
            "registered"
        );
        Ok(registered)
    }

    /// Forget the local identity. The service keeps no session state, so
    /// nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Context` if the profile store cannot be updated.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.context.sign_out().await?;
        tracing::info!("signed out");
        Ok(())
    }
}

impl AuthError {
    /// Whether the caller should send the student back to sign-in.
    #[must_use]
    pub fn needs_sign_in(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized))
    }
}
