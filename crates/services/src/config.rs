use std::env;

use skilltwin_core::model::{ClientSettings, ClientSettingsDraft, SettingsError, StudentId};

pub const API_URL_ENV: &str = "SKILLTWIN_API_URL";
pub const API_TIMEOUT_ENV: &str = "SKILLTWIN_API_TIMEOUT_SECS";
pub const DB_URL_ENV: &str = "SKILLTWIN_DB_URL";
pub const STUDENT_ID_ENV: &str = "SKILLTWIN_STUDENT_ID";

pub const DEFAULT_DB_URL: &str = "sqlite://skilltwin.sqlite3";

/// Environment-derived client configuration. Command-line flags override
/// individual fields before `settings` validates them.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ClientSettingsDraft,
    pub db_url: String,
    pub student_id: Option<StudentId>,
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let timeout_secs = get(API_TIMEOUT_ENV).and_then(|raw| match raw.trim().parse() {
            Ok(secs) => Some(secs),
            Err(_) => {
                tracing::warn!(value = %raw, "ignoring invalid {API_TIMEOUT_ENV}");
                None
            }
        });

        Self {
            api: ClientSettingsDraft {
                api_base_url: get(API_URL_ENV),
                timeout_secs,
            },
            db_url: get(DB_URL_ENV).unwrap_or_else(|| DEFAULT_DB_URL.into()),
            student_id: get(STUDENT_ID_ENV).map(|id| StudentId::new(id.trim())),
        }
    }

    /// # Errors
    ///
    /// Returns `SettingsError` if the API URL or timeout is invalid.
    pub fn settings(&self) -> Result<ClientSettings, SettingsError> {
        self.api.clone().validate()
    }
}
