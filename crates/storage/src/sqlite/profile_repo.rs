use async_trait::async_trait;
use chrono::Utc;
use skilltwin_core::model::{Identity, StudentId, StudentProfile, Theme};
use sqlx::Row;

use crate::repository::{ProfileRepository, StorageError, StoredProfile};

use super::SqliteRepository;

fn column<T>(row: &sqlx::sqlite::SqliteRow, name: &str) -> Result<T, StorageError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|err| StorageError::Serialization(err.to_string()))
}

impl SqliteRepository {
    async fn ensure_row(&self) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO client_profile (id, theme, updated_at)
            VALUES (1, 'light', ?1)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn load_profile(&self) -> Result<StoredProfile, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                student_id,
                email,
                name,
                class_level,
                student_code,
                token,
                theme
            FROM client_profile
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(StoredProfile::default());
        };

        let theme: String = column(&row, "theme")?;
        let theme = theme
            .parse::<Theme>()
            .map_err(|()| StorageError::Serialization(format!("unknown theme: {theme}")))?;

        let student_id: Option<String> = column(&row, "student_id")?;
        let token: Option<String> = column(&row, "token")?;
        let identity = match (student_id, token) {
            (Some(student_id), Some(token)) => {
                let email: Option<String> = column(&row, "email")?;
                let name: Option<String> = column(&row, "name")?;
                Some(Identity::new(
                    StudentProfile {
                        id: StudentId::new(student_id),
                        email: email.unwrap_or_default(),
                        name: name.unwrap_or_default(),
                        class_level: column(&row, "class_level")?,
                        student_id: column(&row, "student_code")?,
                    },
                    token,
                ))
            }
            _ => None,
        };

        Ok(StoredProfile { identity, theme })
    }

    async fn save_identity(&self, identity: Option<&Identity>) -> Result<(), StorageError> {
        self.ensure_row().await?;
        let profile = identity.map(|identity| &identity.profile);
        sqlx::query(
            r"
            UPDATE client_profile SET
                student_id = ?1,
                email = ?2,
                name = ?3,
                class_level = ?4,
                student_code = ?5,
                token = ?6,
                updated_at = ?7
            WHERE id = 1
            ",
        )
        .bind(profile.map(|p| p.id.as_str()))
        .bind(profile.map(|p| p.email.as_str()))
        .bind(profile.map(|p| p.name.as_str()))
        .bind(profile.and_then(|p| p.class_level.as_deref()))
        .bind(profile.and_then(|p| p.student_id.as_deref()))
        .bind(identity.map(|identity| identity.token.as_str()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn save_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.ensure_row().await?;
        sqlx::query("UPDATE client_profile SET theme = ?1, updated_at = ?2 WHERE id = 1")
            .bind(theme.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
