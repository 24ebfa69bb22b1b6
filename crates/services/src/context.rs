use std::sync::{Arc, RwLock};

use skilltwin_core::model::{Identity, StudentId, Theme};
use storage::repository::{ProfileRepository, StoredProfile};

use crate::error::ContextError;

/// Immutable view of who is signed in and how the client is themed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    pub identity: Option<Identity>,
    pub theme: Theme,
}

impl ClientState {
    #[must_use]
    pub fn student_id(&self) -> Option<&StudentId> {
        self.identity.as_ref().map(Identity::student_id)
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.token.as_str())
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }
}

impl From<StoredProfile> for ClientState {
    fn from(stored: StoredProfile) -> Self {
        Self {
            identity: stored.identity,
            theme: stored.theme,
        }
    }
}

/// Explicitly passed application context.
///
/// Readers take a cheap `Arc` of the current state. Writers replace the whole
/// state and persist it through the profile repository; the in-memory swap
/// happens first so a failing store never leaves a stale credential in use.
#[derive(Clone)]
pub struct AppContext {
    state: Arc<RwLock<Arc<ClientState>>>,
    profiles: Arc<dyn ProfileRepository>,
}

impl AppContext {
    /// Signed-out context backed by `profiles`.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self::with_state(profiles, ClientState::default())
    }

    #[must_use]
    pub fn with_state(profiles: Arc<dyn ProfileRepository>, state: ClientState) -> Self {
        Self {
            state: Arc::new(RwLock::new(Arc::new(state))),
            profiles,
        }
    }

    /// Restore the persisted profile.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::Storage` if the profile store cannot be read.
    pub async fn load(profiles: Arc<dyn ProfileRepository>) -> Result<Self, ContextError> {
        let stored = profiles.load_profile().await?;
        tracing::debug!(signed_in = stored.identity.is_some(), "client profile restored");
        Ok(Self::with_state(profiles, stored.into()))
    }

    /// Current state. Falls back to a signed-out default if the lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ClientState> {
        self.state
            .read()
            .map(|guard| Arc::clone(&*guard))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.snapshot().token().map(str::to_owned)
    }

    #[must_use]
    pub fn student_id(&self) -> Option<StudentId> {
        self.snapshot().student_id().cloned()
    }

    /// Replace the identity and persist it.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if the state cannot be swapped or stored.
    pub async fn sign_in(&self, identity: Identity) -> Result<(), ContextError> {
        let next = self.replace(|state| ClientState {
            identity: Some(identity),
            theme: state.theme,
        })?;
        self.profiles.save_identity(next.identity.as_ref()).await?;
        Ok(())
    }

    /// Forget the identity and its persisted copy. The theme survives.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if the state cannot be swapped or stored.
    pub async fn sign_out(&self) -> Result<(), ContextError> {
        self.replace(|state| ClientState {
            identity: None,
            theme: state.theme,
        })?;
        self.profiles.save_identity(None).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ContextError` if the state cannot be swapped or stored.
    pub async fn set_theme(&self, theme: Theme) -> Result<(), ContextError> {
        self.replace(|state| ClientState {
            identity: state.identity.clone(),
            theme,
        })?;
        self.profiles.save_theme(theme).await?;
        Ok(())
    }

    fn replace(
        &self,
        update: impl FnOnce(&ClientState) -> ClientState,
    ) -> Result<Arc<ClientState>, ContextError> {
        let mut guard = self.state.write().map_err(|_| ContextError::Poisoned)?;
        let next = Arc::new(update(&guard));
        *guard = Arc::clone(&next);
        Ok(next)
    }
}
