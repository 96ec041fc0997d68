use serde::{Deserialize, Serialize};

use super::{season::SeasonId, types::UtcDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub i64);

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Game {
    pub id: GameId,
    pub season_id: SeasonId,
    pub bowl_name: String,
    pub home_team: String,
    pub away_team: String,
    pub spread: Option<f64>,
    pub over_under: Option<f64>,
    pub start_time: Option<UtcDateTime>,
    pub is_playoff: bool,
    pub outcome: Option<GameOutcome>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// The recorded final result of a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

/// Whether picks on a game with the given kickoff are closed at `now`.
///
/// This only looks at the schedule. A game without a start time never locks by
/// itself, it has to be graded.
pub fn is_locked(start_time: Option<UtcDateTime>, now: UtcDateTime) -> bool {
    matches!(start_time, Some(start) if start <= now)
}

impl Game {
    pub fn is_locked(&self, now: UtcDateTime) -> bool {
        is_locked(self.start_time, now)
    }

    pub fn is_final(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewGame {
    pub bowl_name: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub over_under: Option<f64>,
    #[serde(default)]
    pub start_time: Option<UtcDateTime>,
    #[serde(default)]
    pub is_playoff: bool,
    #[serde(default)]
    pub outcome: Option<GameOutcome>,
}

/// Partial update of the schedule and odds of a game. Absent fields are left alone.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GameDetailsUpdate {
    pub bowl_name: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub spread: Option<f64>,
    pub over_under: Option<f64>,
    pub start_time: Option<UtcDateTime>,
    pub is_playoff: Option<bool>,
}

impl GameDetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.bowl_name.is_none()
            && self.home_team.is_none()
            && self.away_team.is_none()
            && self.spread.is_none()
            && self.over_under.is_none()
            && self.start_time.is_none()
            && self.is_playoff.is_none()
    }
}

/// A game as shown to participants, with the lock evaluated at read time.
#[derive(Clone, Debug, Serialize)]
pub struct GameView {
    pub id: GameId,
    pub bowl_name: String,
    pub home_team: String,
    pub away_team: String,
    pub spread: Option<f64>,
    pub over_under: Option<f64>,
    pub start_time: Option<UtcDateTime>,
    pub winner: Option<String>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub is_playoff: bool,
    pub is_locked: bool,
}

impl GameView {
    pub fn new(game: Game, now: UtcDateTime) -> GameView {
        let is_locked = game.is_locked(now);
        let (winner, home_score, away_score) = match game.outcome {
            Some(outcome) => (Some(outcome.winner), outcome.home_score, outcome.away_score),
            None => (None, None, None),
        };

        GameView {
            id: game.id,
            bowl_name: game.bowl_name,
            home_team: game.home_team,
            away_team: game.away_team,
            spread: game.spread,
            over_under: game.over_under,
            start_time: game.start_time,
            winner,
            home_score,
            away_score,
            is_playoff: game.is_playoff,
            is_locked,
        }
    }
}
