use thiserror::Error;
use time::{format_description::well_known::Iso8601, OffsetDateTime};

use crate::models::{
    types::{InvalidSeasonLabel, SeasonLabel, UtcDateTime},
    ArchiveId, Correctness, GameId, PickId, SeasonId, UserId,
};

pub trait DBConvertible: Sized {
    type DBType;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError>;

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError>;
}

#[derive(Debug, Error)]
pub enum DBFromConversionError {
    #[error("Failed to parse datetime: {0}")]
    DateTime(#[from] time::error::Parse),
    #[error("Failed to parse season label: {0}")]
    SeasonLabel(#[from] InvalidSeasonLabel),
    #[error("Invalid number: {0}")]
    InvalidNumber(i64),
    #[error("Unknown {entity} id {id} referenced")]
    UnknownReference { entity: &'static str, id: i64 },
}

#[derive(Debug, Error)]
pub enum DBToConversionError {
    #[error("Failed to format datetime")]
    DateTime(#[from] time::error::Format),
}

impl DBConvertible for UtcDateTime {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        let string = OffsetDateTime::from(*self).format(&Iso8601::DEFAULT)?;
        Ok(string)
    }

    fn from_db(db_value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        let datetime = OffsetDateTime::parse(db_value, &Iso8601::DEFAULT)?;
        Ok(UtcDateTime::from(datetime))
    }
}

impl<T: DBConvertible> DBConvertible for Option<T> {
    type DBType = Option<T::DBType>;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        self.as_ref().map(T::to_db).transpose()
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        value.as_ref().map(T::from_db).transpose()
    }
}

impl DBConvertible for SeasonLabel {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.as_str().to_string())
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(value.parse()?)
    }
}

impl DBConvertible for Correctness {
    type DBType = Option<bool>;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.as_option())
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Correctness::from(*value))
    }
}

impl DBConvertible for SeasonId {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.0)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(SeasonId(*value))
    }
}

impl DBConvertible for UserId {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.0)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(UserId(*value))
    }
}

impl DBConvertible for GameId {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.0)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(GameId(*value))
    }
}

impl DBConvertible for PickId {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.0)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(PickId(*value))
    }
}

impl DBConvertible for ArchiveId {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.0)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(ArchiveId(*value))
    }
}

/// Scores are small non-negative numbers, anything else in the database is corrupt.
pub fn score_from_db(value: Option<i64>) -> Result<Option<i64>, DBFromConversionError> {
    match value {
        Some(score) if !(0..=i64::from(u16::MAX)).contains(&score) => {
            Err(DBFromConversionError::InvalidNumber(score))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;
    use time::macros::datetime;

    use super::{score_from_db, DBConvertible};
    use crate::models::{types::UtcDateTime, Correctness};

    #[test]
    fn datetime_survives_the_database() {
        let kickoff = UtcDateTime::from(datetime!(2024-12-31 20:30:15 UTC));
        let stored = kickoff.to_db().unwrap();
        assert_eq!(UtcDateTime::from_db(&stored).unwrap(), kickoff);
    }

    #[test]
    fn missing_datetime_stays_missing() {
        let stored: Option<String> = None::<UtcDateTime>.to_db().unwrap();
        assert_eq!(stored, None);
        assert_eq!(Option::<UtcDateTime>::from_db(&None).unwrap(), None);
    }

    #[test]
    fn correctness_is_nullable_bool() {
        assert_eq!(Correctness::from_db(&None).unwrap(), Correctness::Pending);
        assert_eq!(Correctness::from_db(&Some(true)).unwrap(), Correctness::Correct);
        assert_eq!(Correctness::Incorrect.to_db().unwrap(), Some(false));
    }

    #[test]
    fn negative_scores_are_rejected() {
        assert!(score_from_db(Some(-3)).is_err());
        assert_eq!(score_from_db(Some(42)).unwrap(), Some(42));
        assert_eq!(score_from_db(None).unwrap(), None);
    }
}
