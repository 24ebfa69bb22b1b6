use thiserror::Error;

use crate::model::{QuestionError, SessionStatusError, SettingsError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    SessionStatus(#[from] SessionStatusError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
