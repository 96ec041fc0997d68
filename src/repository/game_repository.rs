use sqlx::{query, query_as, FromRow, Pool, Sqlite, SqliteConnection};

use crate::{
    error::PicksError,
    models::{types::UtcDateTime, Game, GameId, GameOutcome, NewGame, SeasonId},
    repository::conversion::{score_from_db, DBConvertible},
};

use super::conversion::{DBFromConversionError, DBToConversionError};

const GAME_COLUMNS: &str = r#"
    id, season_id, bowl_name, home_team, away_team, spread, over_under, start_time,
    is_playoff, winner, home_score, away_score, created_at, updated_at
"#;

#[derive(Debug)]
pub struct GameRepository {
    pool: Pool<Sqlite>,
}

impl GameRepository {
    pub fn new(pool: Pool<Sqlite>) -> GameRepository {
        GameRepository { pool }
    }

    pub async fn get_game(&self, game: GameId) -> Result<Option<Game>, PicksError> {
        let mut connection = self.pool.acquire().await?;
        fetch_game(&mut connection, game).await
    }
}

pub async fn fetch_game(
    connection: &mut SqliteConnection,
    game: GameId,
) -> Result<Option<Game>, PicksError> {
    let game = game.to_db()?;
    let row = query_as::<_, SqlGame>(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
        .bind(game)
        .fetch_optional(&mut *connection)
        .await?;

    match row {
        Some(row) => Ok(Some(Game::from_db(&row)?)),
        None => Ok(None),
    }
}

/// Games of a season in kickoff order. Unscheduled games come first.
pub async fn fetch_season_games(
    connection: &mut SqliteConnection,
    season: SeasonId,
) -> Result<Vec<Game>, PicksError> {
    let season = season.to_db()?;
    let rows = query_as::<_, SqlGame>(&format!(
        "SELECT {GAME_COLUMNS} FROM games WHERE season_id = $1 ORDER BY start_time, id"
    ))
    .bind(season)
    .fetch_all(&mut *connection)
    .await?;

    Ok(rows
        .iter()
        .map(Game::from_db)
        .collect::<Result<Vec<_>, _>>()?)
}

pub async fn find_game_by_teams(
    connection: &mut SqliteConnection,
    season: SeasonId,
    home_team: &str,
    away_team: &str,
) -> Result<Option<Game>, PicksError> {
    let season = season.to_db()?;
    let row = query_as::<_, SqlGame>(&format!(
        r#"
            SELECT {GAME_COLUMNS} FROM games
            WHERE season_id = $1 AND home_team = $2 AND away_team = $3
            ORDER BY id
            LIMIT 1
        "#
    ))
    .bind(season)
    .bind(home_team)
    .bind(away_team)
    .fetch_optional(&mut *connection)
    .await?;

    match row {
        Some(row) => Ok(Some(Game::from_db(&row)?)),
        None => Ok(None),
    }
}

pub async fn insert_game(
    connection: &mut SqliteConnection,
    season: SeasonId,
    new_game: &NewGame,
    now: UtcDateTime,
) -> Result<Game, PicksError> {
    let season = season.to_db()?;
    let start_time = new_game.start_time.to_db()?;
    let now = now.to_db()?;
    let (winner, home_score, away_score) = match &new_game.outcome {
        Some(outcome) => (
            Some(outcome.winner.as_str()),
            outcome.home_score,
            outcome.away_score,
        ),
        None => (None, None, None),
    };

    let row = query_as::<_, SqlGame>(&format!(
        r#"
            INSERT INTO games (
                season_id,
                bowl_name,
                home_team,
                away_team,
                spread,
                over_under,
                start_time,
                is_playoff,
                winner,
                home_score,
                away_score,
                created_at,
                updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {GAME_COLUMNS}
        "#
    ))
    .bind(season)
    .bind(&new_game.bowl_name)
    .bind(&new_game.home_team)
    .bind(&new_game.away_team)
    .bind(new_game.spread)
    .bind(new_game.over_under)
    .bind(start_time)
    .bind(new_game.is_playoff)
    .bind(winner)
    .bind(home_score)
    .bind(away_score)
    .bind(now)
    .fetch_one(&mut *connection)
    .await?;

    Ok(Game::from_db(&row)?)
}

/// Writes every mutable column of `game` back to its row.
pub async fn save_game(connection: &mut SqliteConnection, game: &Game) -> Result<(), PicksError> {
    let row = game.to_db()?;

    let result = query(
        r#"
            UPDATE games SET
                bowl_name = $2,
                home_team = $3,
                away_team = $4,
                spread = $5,
                over_under = $6,
                start_time = $7,
                is_playoff = $8,
                winner = $9,
                home_score = $10,
                away_score = $11,
                updated_at = $12
            WHERE id = $1
        "#,
    )
    .bind(row.id)
    .bind(row.bowl_name)
    .bind(row.home_team)
    .bind(row.away_team)
    .bind(row.spread)
    .bind(row.over_under)
    .bind(row.start_time)
    .bind(row.is_playoff)
    .bind(row.winner)
    .bind(row.home_score)
    .bind(row.away_score)
    .bind(row.updated_at)
    .execute(&mut *connection)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PicksError::not_found("game", game.id));
    }

    Ok(())
}

/// Overwrites the lines that are given and leaves every other column alone.
/// Returns false when the game no longer exists.
pub async fn update_odds(
    connection: &mut SqliteConnection,
    game: GameId,
    spread: Option<f64>,
    over_under: Option<f64>,
    updated_at: UtcDateTime,
) -> Result<bool, PicksError> {
    let game = game.to_db()?;
    let updated_at = updated_at.to_db()?;

    let result = query(
        r#"
            UPDATE games SET
                spread = COALESCE($2, spread),
                over_under = COALESCE($3, over_under),
                updated_at = $4
            WHERE id = $1
        "#,
    )
    .bind(game)
    .bind(spread)
    .bind(over_under)
    .bind(updated_at)
    .execute(&mut *connection)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_game(connection: &mut SqliteConnection, game: GameId) -> Result<bool, PicksError> {
    let game = game.to_db()?;
    let result = query(r#"DELETE FROM games WHERE id = $1"#)
        .bind(game)
        .execute(&mut *connection)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(Debug, FromRow)]
pub struct SqlGame {
    id: i64,
    season_id: i64,
    bowl_name: String,
    home_team: String,
    away_team: String,
    spread: Option<f64>,
    over_under: Option<f64>,
    start_time: Option<String>,
    is_playoff: bool,
    winner: Option<String>,
    home_score: Option<i64>,
    away_score: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl DBConvertible for Game {
    type DBType = SqlGame;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        let (winner, home_score, away_score) = match &self.outcome {
            Some(outcome) => (
                Some(outcome.winner.clone()),
                outcome.home_score,
                outcome.away_score,
            ),
            None => (None, None, None),
        };

        Ok(SqlGame {
            id: self.id.to_db()?,
            season_id: self.season_id.to_db()?,
            bowl_name: self.bowl_name.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            spread: self.spread,
            over_under: self.over_under,
            start_time: self.start_time.to_db()?,
            is_playoff: self.is_playoff,
            winner,
            home_score,
            away_score,
            created_at: self.created_at.to_db()?,
            updated_at: self.updated_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        // Scores without a winner are kept out of the model, only a recorded winner finalizes a game.
        let outcome = match &value.winner {
            Some(winner) => Some(GameOutcome {
                winner: winner.clone(),
                home_score: score_from_db(value.home_score)?,
                away_score: score_from_db(value.away_score)?,
            }),
            None => None,
        };

        Ok(Game {
            id: GameId::from_db(&value.id)?,
            season_id: SeasonId::from_db(&value.season_id)?,
            bowl_name: value.bowl_name.clone(),
            home_team: value.home_team.clone(),
            away_team: value.away_team.clone(),
            spread: value.spread,
            over_under: value.over_under,
            start_time: Option::<UtcDateTime>::from_db(&value.start_time)?,
            is_playoff: value.is_playoff,
            outcome,
            created_at: UtcDateTime::from_db(&value.created_at)?,
            updated_at: UtcDateTime::from_db(&value.updated_at)?,
        })
    }
}
