use sqlx::{query_as, query_scalar, FromRow, Pool, Sqlite, SqliteConnection};

use crate::{
    error::{conflict_on_unique, PicksError},
    models::{
        types::{SeasonLabel, UtcDateTime},
        ArchiveId, ArchiveSummary, ArchivedGame, ArchivedSeason, RankedStanding,
    },
    repository::conversion::DBConvertible,
};

#[derive(Debug)]
pub struct ArchiveRepository {
    pool: Pool<Sqlite>,
}

impl ArchiveRepository {
    pub fn new(pool: Pool<Sqlite>) -> ArchiveRepository {
        ArchiveRepository { pool }
    }

    /// Archive summaries, newest season first.
    pub async fn list_archives(&self) -> Result<Vec<ArchiveSummary>, PicksError> {
        let rows = query_as::<_, SqlArchiveSummary>(
            r#"SELECT id, label, created_at FROM archived_seasons ORDER BY label DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<_, PicksError> {
                Ok(ArchiveSummary {
                    id: ArchiveId::from_db(&row.id)?,
                    label: SeasonLabel::from_db(&row.label)?,
                    created_at: UtcDateTime::from_db(&row.created_at)?,
                })
            })
            .collect()
    }

    pub async fn get_archive(&self, label: &SeasonLabel) -> Result<ArchivedSeason, PicksError> {
        let db_label = label.to_db()?;
        let row = query_as::<_, SqlArchivedSeason>(
            r#"
                SELECT id, label, games_json, standings_json, created_at
                FROM archived_seasons
                WHERE label = $1
            "#,
        )
        .bind(db_label)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PicksError::not_found("archived season", label))?;

        row.into_archive()
    }
}

pub async fn archive_exists(
    connection: &mut SqliteConnection,
    label: &SeasonLabel,
) -> Result<bool, PicksError> {
    let label = label.to_db()?;
    let count: i64 = query_scalar(r#"SELECT COUNT(*) FROM archived_seasons WHERE label = $1"#)
        .bind(label)
        .fetch_one(&mut *connection)
        .await?;

    Ok(count > 0)
}

pub async fn insert_archive(
    connection: &mut SqliteConnection,
    label: &SeasonLabel,
    games: &[ArchivedGame],
    standings: &[RankedStanding],
    now: UtcDateTime,
) -> Result<ArchivedSeason, PicksError> {
    let db_label = label.to_db()?;
    let games_json = serde_json::to_string(games)?;
    let standings_json = serde_json::to_string(standings)?;
    let created_at = now.to_db()?;

    let row = query_as::<_, SqlArchivedSeason>(
        r#"
            INSERT INTO archived_seasons (label, games_json, standings_json, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, label, games_json, standings_json, created_at
        "#,
    )
    .bind(db_label)
    .bind(games_json)
    .bind(standings_json)
    .bind(created_at)
    .fetch_one(&mut *connection)
    .await
    .map_err(|err| conflict_on_unique(err, || format!("Season {label} is already archived")))?;

    row.into_archive()
}

#[derive(Debug, FromRow)]
struct SqlArchiveSummary {
    id: i64,
    label: String,
    created_at: String,
}

#[derive(Debug, FromRow)]
struct SqlArchivedSeason {
    id: i64,
    label: String,
    games_json: String,
    standings_json: String,
    created_at: String,
}

impl SqlArchivedSeason {
    fn into_archive(self) -> Result<ArchivedSeason, PicksError> {
        Ok(ArchivedSeason {
            id: ArchiveId::from_db(&self.id)?,
            label: SeasonLabel::from_db(&self.label)?,
            games: serde_json::from_str(&self.games_json)?,
            standings: serde_json::from_str(&self.standings_json)?,
            created_at: UtcDateTime::from_db(&self.created_at)?,
        })
    }
}
