use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::StudentId;

/// Signed-in student as described by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class_level: Option<String>,
    /// Human-facing enrolment code, distinct from `id`.
    #[serde(default)]
    pub student_id: Option<String>,
}

/// A profile plus the bearer credential issued at sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub profile: StudentProfile,
    pub token: String,
}

impl Identity {
    #[must_use]
    pub fn new(profile: StudentProfile, token: impl Into<String>) -> Self {
        Self {
            profile,
            token: token.into(),
        }
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.profile.id
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("profile", &self.profile)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_debug_hides_token() {
        let identity = Identity::new(
            StudentProfile {
                id: StudentId::new("s-1"),
                email: "ada@example.com".into(),
                name: "Ada".into(),
                class_level: None,
                student_id: None,
            },
            "secret-token",
        );
        let rendered = format!("{identity:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("ada@example.com"));
    }

    #[test]
    fn theme_parses_and_toggles() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn profile_ignores_unknown_fields() {
        let profile: StudentProfile = serde_json::from_str(
            r#"{"id": "9", "email": "a@b.c", "name": "A", "goals": null, "last_login": null}"#,
        )
        .unwrap();
        assert_eq!(profile.id, StudentId::new("9"));
        assert_eq!(profile.class_level, None);
    }
}
