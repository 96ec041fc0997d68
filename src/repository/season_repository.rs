use sqlx::{query, query_as, FromRow, Pool, Sqlite, SqliteConnection};
use tracing::info;

use crate::{
    error::{conflict_on_unique, PicksError},
    models::{
        types::{SeasonLabel, UtcDateTime},
        Season, SeasonId, SeasonSummary,
    },
    repository::conversion::DBConvertible,
};

use super::conversion::{DBFromConversionError, DBToConversionError};

#[derive(Debug)]
pub struct SeasonRepository {
    pool: Pool<Sqlite>,
}

impl SeasonRepository {
    pub fn new(pool: Pool<Sqlite>) -> SeasonRepository {
        SeasonRepository { pool }
    }

    pub async fn active_season(&self) -> Result<Option<Season>, PicksError> {
        let mut connection = self.pool.acquire().await?;
        fetch_active_season(&mut connection).await
    }

    /// All seasons, newest first, flagged with whether they have been archived.
    pub async fn list_seasons(&self) -> Result<Vec<SeasonSummary>, PicksError> {
        let rows = query_as::<_, SqlSeasonSummary>(
            r#"
                SELECT
                    seasons.label AS label,
                    seasons.is_active AS is_active,
                    archived_seasons.id IS NOT NULL AS is_archived
                FROM seasons
                LEFT JOIN archived_seasons ON archived_seasons.label = seasons.label
                ORDER BY seasons.label DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<_, PicksError> {
                Ok(SeasonSummary {
                    label: SeasonLabel::from_db(&row.label)?,
                    is_active: row.is_active,
                    is_archived: row.is_archived,
                })
            })
            .collect()
    }

    /// Returns the active season, creating `label` as the active one when there is none.
    pub async fn ensure_active_season(
        &self,
        label: &SeasonLabel,
        now: UtcDateTime,
    ) -> Result<Season, PicksError> {
        let mut transaction = self.pool.begin().await?;

        if let Some(active) = fetch_active_season(&mut transaction).await? {
            transaction.commit().await?;
            return Ok(active);
        }

        let season = insert_active_season(&mut transaction, label, now).await?;
        transaction.commit().await?;

        info!("Created season {} as the active season", season.label);

        Ok(season)
    }
}

pub async fn fetch_active_season(
    connection: &mut SqliteConnection,
) -> Result<Option<Season>, PicksError> {
    let row = query_as::<_, SqlSeason>(
        r#"
            SELECT id, label, is_active, created_at
            FROM seasons
            WHERE is_active = TRUE
            LIMIT 1
        "#,
    )
    .fetch_optional(&mut *connection)
    .await?;

    match row {
        Some(row) => Ok(Some(Season::from_db(&row)?)),
        None => Ok(None),
    }
}

pub async fn deactivate_season(
    connection: &mut SqliteConnection,
    season: SeasonId,
) -> Result<(), PicksError> {
    let season = season.to_db()?;
    let result = query(r#"UPDATE seasons SET is_active = FALSE WHERE id = $1"#)
        .bind(season)
        .execute(&mut *connection)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PicksError::not_found("season", season));
    }

    Ok(())
}

/// Inserts `label` as the active season.
///
/// Fails with a conflict if the label is taken or another season is still active.
pub async fn insert_active_season(
    connection: &mut SqliteConnection,
    label: &SeasonLabel,
    now: UtcDateTime,
) -> Result<Season, PicksError> {
    let db_label = label.to_db()?;
    let created_at = now.to_db()?;

    let row = query_as::<_, SqlSeason>(
        r#"
            INSERT INTO seasons (label, is_active, created_at)
            VALUES ($1, TRUE, $2)
            RETURNING id, label, is_active, created_at
        "#,
    )
    .bind(&db_label)
    .bind(created_at)
    .fetch_one(&mut *connection)
    .await
    .map_err(|err| {
        conflict_on_unique(err, || {
            format!("Cannot create season {label}: it already exists or another season is active")
        })
    })?;

    Ok(Season::from_db(&row)?)
}

#[derive(Debug, FromRow)]
pub struct SqlSeason {
    id: i64,
    label: String,
    is_active: bool,
    created_at: String,
}

#[derive(Debug, FromRow)]
struct SqlSeasonSummary {
    label: String,
    is_active: bool,
    is_archived: bool,
}

impl DBConvertible for Season {
    type DBType = SqlSeason;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlSeason {
            id: self.id.to_db()?,
            label: self.label.to_db()?,
            is_active: self.is_active,
            created_at: self.created_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Season {
            id: SeasonId::from_db(&value.id)?,
            label: SeasonLabel::from_db(&value.label)?,
            is_active: value.is_active,
            created_at: UtcDateTime::from_db(&value.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{deactivate_season, fetch_active_season, insert_active_season, SeasonRepository};
    use crate::{
        error::PicksError,
        models::types::{SeasonLabel, UtcDateTime},
        repository::test_pool,
    };

    fn label(value: &str) -> SeasonLabel {
        value.parse().unwrap()
    }

    #[test(tokio::test)]
    async fn ensure_creates_the_first_season_once() {
        let pool = test_pool().await;
        let seasons = SeasonRepository::new(pool);

        let first = seasons
            .ensure_active_season(&label("2024-25"), UtcDateTime::now())
            .await
            .unwrap();
        assert!(first.is_active);
        assert_eq!(first.label, label("2024-25"));

        // A different configured label does not create a second active season.
        let again = seasons
            .ensure_active_season(&label("2030-31"), UtcDateTime::now())
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(seasons.list_seasons().await.unwrap().len(), 1);
    }

    #[test(tokio::test)]
    async fn second_active_season_is_a_conflict() {
        let pool = test_pool().await;
        let mut connection = pool.acquire().await.unwrap();

        insert_active_season(&mut connection, &label("2024-25"), UtcDateTime::now())
            .await
            .unwrap();
        let err = insert_active_season(&mut connection, &label("2025-26"), UtcDateTime::now())
            .await
            .unwrap_err();

        assert!(matches!(err, PicksError::Conflict { .. }), "{err:?}");
    }

    #[test(tokio::test)]
    async fn deactivated_season_is_no_longer_active() {
        let pool = test_pool().await;
        let mut connection = pool.acquire().await.unwrap();

        let season = insert_active_season(&mut connection, &label("2024-25"), UtcDateTime::now())
            .await
            .unwrap();
        deactivate_season(&mut connection, season.id).await.unwrap();

        assert_eq!(fetch_active_season(&mut connection).await.unwrap(), None);
    }
}
