use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::{
    models::{types::InvalidSeasonLabel, GameId},
    repository::{DBFromConversionError, DBToConversionError},
};

#[derive(Debug, Error)]
pub enum PicksError {
    #[error("{entity} `{key}` not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Game {0} is locked, picks can no longer be changed")]
    GameLocked(GameId),

    #[error("Invalid team `{team}`, must be `{home_team}` or `{away_team}`")]
    InvalidSelection {
        team: String,
        home_team: String,
        away_team: String,
    },

    #[error("Invalid or expired credentials")]
    Unauthorized,

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    FromDb(#[from] DBFromConversionError),

    #[error(transparent)]
    ToDb(#[from] DBToConversionError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// The failure categories callers get to see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    GameLocked,
    InvalidSelection,
    Unauthorized,
    InvalidInput,
    Internal,
}

impl PicksError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> PicksError {
        PicksError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> PicksError {
        PicksError::Conflict {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use PicksError::*;

        match self {
            NotFound { .. } => ErrorKind::NotFound,
            Conflict { .. } => ErrorKind::Conflict,
            GameLocked(_) => ErrorKind::GameLocked,
            InvalidSelection { .. } => ErrorKind::InvalidSelection,
            Unauthorized => ErrorKind::Unauthorized,
            InvalidInput(_) => ErrorKind::InvalidInput,
            Database(_) | FromDb(_) | ToDb(_) | Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<InvalidSeasonLabel> for PicksError {
    fn from(value: InvalidSeasonLabel) -> Self {
        PicksError::InvalidInput(value.to_string())
    }
}

/// Maps a unique constraint violation to a [`PicksError::Conflict`], passes anything else through.
pub fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> PicksError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            PicksError::conflict(message())
        }
        _ => PicksError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{ErrorKind, PicksError};
    use crate::models::GameId;

    #[test]
    fn kinds_are_snake_case() {
        assert_eq!(ErrorKind::GameLocked.to_string(), "game_locked");
        let kind: &'static str = ErrorKind::InvalidSelection.into();
        assert_eq!(kind, "invalid_selection");
    }

    #[test]
    fn database_errors_are_internal() {
        assert_eq!(
            PicksError::Database(sqlx::Error::RowNotFound).kind(),
            ErrorKind::Internal
        );
        assert_eq!(PicksError::GameLocked(GameId(1)).kind(), ErrorKind::GameLocked);
    }
}
