use async_trait::async_trait;
use skilltwin_core::model::{Identity, Theme};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Client state that survives restarts: who is signed in and the theme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredProfile {
    pub identity: Option<Identity>,
    pub theme: Theme,
}

/// Repository contract for the locally persisted client profile.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Load the stored profile. A fresh store yields the default profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or holds invalid data.
    async fn load_profile(&self) -> Result<StoredProfile, StorageError>;

    /// Replace the stored identity; `None` signs out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the identity cannot be stored.
    async fn save_identity(&self, identity: Option<&Identity>) -> Result<(), StorageError>;

    /// Persist the theme preference.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the theme cannot be stored.
    async fn save_theme(&self, theme: Theme) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    profile: Arc<Mutex<StoredProfile>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profile(profile: StoredProfile) -> Self {
        Self {
            profile: Arc::new(Mutex::new(profile)),
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn load_profile(&self) -> Result<StoredProfile, StorageError> {
        let guard = self
            .profile
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_identity(&self, identity: Option<&Identity>) -> Result<(), StorageError> {
        let mut guard = self
            .profile
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.identity = identity.cloned();
        Ok(())
    }

    async fn save_theme(&self, theme: Theme) -> Result<(), StorageError> {
        let mut guard = self
            .profile
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.theme = theme;
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            profiles: Arc::new(InMemoryRepository::new()),
        }
    }
}
