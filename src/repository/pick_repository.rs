use sqlx::{query, query_as, FromRow, Pool, Sqlite, SqliteConnection};

use crate::{
    error::PicksError,
    models::{
        is_locked, types::UtcDateTime, Correctness, GameId, NewPick, Pick, PickId, PickView,
        SeasonId, UserId,
    },
    repository::conversion::DBConvertible,
};

use super::conversion::{DBFromConversionError, DBToConversionError};

const PICK_COLUMNS: &str =
    "id, user_id, game_id, picked_team, is_locked, is_correct, created_at, updated_at";

#[derive(Debug)]
pub struct PickRepository {
    pool: Pool<Sqlite>,
}

impl PickRepository {
    pub fn new(pool: Pool<Sqlite>) -> PickRepository {
        PickRepository { pool }
    }

    /// Picks on the games of a season, with the lock as participants see it at `now`.
    pub async fn list_season_picks(
        &self,
        season: SeasonId,
        now: UtcDateTime,
    ) -> Result<Vec<PickView>, PicksError> {
        let season = season.to_db()?;
        let rows = query_as::<_, SqlPickView>(
            r#"
                SELECT
                    picks.id AS id,
                    picks.game_id AS game_id,
                    users.name AS user_name,
                    picks.picked_team AS picked_team,
                    picks.is_locked AS is_locked,
                    picks.is_correct AS is_correct,
                    games.start_time AS start_time
                FROM picks
                JOIN games ON games.id = picks.game_id
                JOIN users ON users.id = picks.user_id
                WHERE games.season_id = $1
                ORDER BY games.start_time, games.id, users.id
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<_, PicksError> {
                let start_time = Option::<UtcDateTime>::from_db(&row.start_time)?;

                Ok(PickView {
                    id: PickId::from_db(&row.id)?,
                    game_id: GameId::from_db(&row.game_id)?,
                    user_name: row.user_name.clone(),
                    picked_team: row.picked_team.clone(),
                    is_locked: row.is_locked || is_locked(start_time, now),
                    is_correct: Correctness::from_db(&row.is_correct)?,
                })
            })
            .collect()
    }
}

pub async fn fetch_pick(
    connection: &mut SqliteConnection,
    user: UserId,
    game: GameId,
) -> Result<Option<Pick>, PicksError> {
    let user = user.to_db()?;
    let game = game.to_db()?;
    let row = query_as::<_, SqlPick>(&format!(
        "SELECT {PICK_COLUMNS} FROM picks WHERE user_id = $1 AND game_id = $2"
    ))
    .bind(user)
    .bind(game)
    .fetch_optional(&mut *connection)
    .await?;

    match row {
        Some(row) => Ok(Some(Pick::from_db(&row)?)),
        None => Ok(None),
    }
}

pub async fn fetch_season_picks(
    connection: &mut SqliteConnection,
    season: SeasonId,
) -> Result<Vec<Pick>, PicksError> {
    let season = season.to_db()?;
    let rows = query_as::<_, SqlPick>(&format!(
        r#"
            SELECT {PICK_COLUMNS} FROM picks
            WHERE game_id IN (SELECT id FROM games WHERE season_id = $1)
            ORDER BY id
        "#
    ))
    .bind(season)
    .fetch_all(&mut *connection)
    .await?;

    Ok(rows
        .iter()
        .map(Pick::from_db)
        .collect::<Result<Vec<_>, _>>()?)
}

pub async fn insert_pick(
    connection: &mut SqliteConnection,
    pick: &NewPick,
) -> Result<Pick, PicksError> {
    let user = pick.user_id.to_db()?;
    let game = pick.game_id.to_db()?;
    let submitted_at = pick.submitted_at.to_db()?;

    let row = query_as::<_, SqlPick>(&format!(
        r#"
            INSERT INTO picks (user_id, game_id, picked_team, is_locked, is_correct, created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, NULL, $4, $4)
            RETURNING {PICK_COLUMNS}
        "#
    ))
    .bind(user)
    .bind(game)
    .bind(&pick.picked_team)
    .bind(submitted_at)
    .fetch_one(&mut *connection)
    .await?;

    Ok(Pick::from_db(&row)?)
}

/// Changes the team of an unlocked pick. A locked pick is left alone and `None` is returned.
pub async fn update_picked_team(
    connection: &mut SqliteConnection,
    pick: PickId,
    picked_team: &str,
    submitted_at: UtcDateTime,
) -> Result<Option<Pick>, PicksError> {
    let pick = pick.to_db()?;
    let submitted_at = submitted_at.to_db()?;

    let row = query_as::<_, SqlPick>(&format!(
        r#"
            UPDATE picks SET picked_team = $2, updated_at = $3
            WHERE id = $1 AND is_locked = FALSE
            RETURNING {PICK_COLUMNS}
        "#
    ))
    .bind(pick)
    .bind(picked_team)
    .bind(submitted_at)
    .fetch_optional(&mut *connection)
    .await?;

    match row {
        Some(row) => Ok(Some(Pick::from_db(&row)?)),
        None => Ok(None),
    }
}

/// Recomputes correctness of every pick on `game` against `winner` and locks them.
/// Returns the number of picks graded.
pub async fn grade_game_picks(
    connection: &mut SqliteConnection,
    game: GameId,
    winner: &str,
    graded_at: UtcDateTime,
) -> Result<u64, PicksError> {
    let game = game.to_db()?;
    let graded_at = graded_at.to_db()?;

    let result = query(
        r#"
            UPDATE picks
            SET is_correct = (picked_team = $2), is_locked = TRUE, updated_at = $3
            WHERE game_id = $1
        "#,
    )
    .bind(game)
    .bind(winner)
    .bind(graded_at)
    .execute(&mut *connection)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_game_picks(
    connection: &mut SqliteConnection,
    game: GameId,
) -> Result<u64, PicksError> {
    let game = game.to_db()?;
    let result = query(r#"DELETE FROM picks WHERE game_id = $1"#)
        .bind(game)
        .execute(&mut *connection)
        .await?;

    Ok(result.rows_affected())
}

#[derive(Debug, FromRow)]
pub struct SqlPick {
    id: i64,
    user_id: i64,
    game_id: i64,
    picked_team: String,
    is_locked: bool,
    is_correct: Option<bool>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, FromRow)]
struct SqlPickView {
    id: i64,
    game_id: i64,
    user_name: String,
    picked_team: String,
    is_locked: bool,
    is_correct: Option<bool>,
    start_time: Option<String>,
}

impl DBConvertible for Pick {
    type DBType = SqlPick;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlPick {
            id: self.id.to_db()?,
            user_id: self.user_id.to_db()?,
            game_id: self.game_id.to_db()?,
            picked_team: self.picked_team.clone(),
            is_locked: self.locked,
            is_correct: self.correctness.to_db()?,
            created_at: self.created_at.to_db()?,
            updated_at: self.updated_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Pick {
            id: PickId::from_db(&value.id)?,
            user_id: UserId::from_db(&value.user_id)?,
            game_id: GameId::from_db(&value.game_id)?,
            picked_team: value.picked_team.clone(),
            locked: value.is_locked,
            correctness: Correctness::from_db(&value.is_correct)?,
            created_at: UtcDateTime::from_db(&value.created_at)?,
            updated_at: UtcDateTime::from_db(&value.updated_at)?,
        })
    }
}
