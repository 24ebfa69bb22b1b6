use thiserror::Error;
use url::Url;

/// Default backend location used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSettings {
    api_base_url: Url,
    timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ClientSettingsDraft {
    pub api_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("API base URL must use http or https: {0}")]
    UnsupportedScheme(String),
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
}

impl ClientSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft.
    ///
    /// Blank values fall back to defaults. A trailing slash is stripped so
    /// endpoint paths can be appended directly.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the URL does not parse, is not http(s), or
    /// the timeout is zero.
    pub fn validate(self) -> Result<ClientSettings, SettingsError> {
        let raw = normalize_optional(self.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let trimmed = raw.trim_end_matches('/');
        let api_base_url =
            Url::parse(trimmed).map_err(|_| SettingsError::InvalidBaseUrl(raw.clone()))?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(SettingsError::UnsupportedScheme(raw));
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(SettingsError::ZeroTimeout);
        }

        Ok(ClientSettings {
            api_base_url,
            timeout_secs,
        })
    }
}

impl ClientSettings {
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_str().trim_end_matches('/')
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Absolute URL for an endpoint path such as `/health`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url(), path.trim_start_matches('/'))
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
