use serde::Serialize;

use super::{game::GameId, types::UtcDateTime, user::UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PickId(pub i64);

/// Grading state of a pick. Stays `Pending` until the game result is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correctness {
    Pending,
    Correct,
    Incorrect,
}

impl Correctness {
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Correctness::Pending => None,
            Correctness::Correct => Some(true),
            Correctness::Incorrect => Some(false),
        }
    }
}

impl From<Option<bool>> for Correctness {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Correctness::Pending,
            Some(true) => Correctness::Correct,
            Some(false) => Correctness::Incorrect,
        }
    }
}

impl Serialize for Correctness {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pick {
    pub id: PickId,
    pub user_id: UserId,
    pub game_id: GameId,
    pub picked_team: String,
    pub locked: bool,
    pub correctness: Correctness,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(Debug)]
pub struct NewPick {
    pub user_id: UserId,
    pub game_id: GameId,
    pub picked_team: String,
    pub submitted_at: UtcDateTime,
}

/// A pick as shown to participants.
///
/// `is_locked` combines the persisted flag with the live schedule lock of the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PickView {
    pub id: PickId,
    pub game_id: GameId,
    pub user_name: String,
    pub picked_team: String,
    pub is_locked: bool,
    pub is_correct: Correctness,
}
