use std::{collections::HashMap, sync::Arc};

use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::{
    clock::Clock,
    error::PicksError,
    models::{ArchivedGame, ArchivedPick, ArchivedSeason, Game, Pick, Season, User},
    repository::{
        archive_repository, game_repository, pick_repository, season_repository, user_repository,
        DBFromConversionError,
    },
    services::standings_service::{rank_standings, to_ranked},
    write_guards::WriteGuards,
};

pub struct ArchiveService {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    guards: Arc<WriteGuards>,
}

impl ArchiveService {
    pub fn new(pool: Pool<Sqlite>, clock: Arc<dyn Clock>, guards: Arc<WriteGuards>) -> ArchiveService {
        ArchiveService {
            pool,
            clock,
            guards,
        }
    }

    /// Freezes the active season into an archive and makes its successor the active season.
    ///
    /// Returns the archive and the new active season.
    #[tracing::instrument(skip(self))]
    pub async fn archive_active_season(&self) -> Result<(ArchivedSeason, Season), PicksError> {
        let _guard = self.guards.lock_season().await;
        let now = self.clock.now();

        let mut transaction = self.pool.begin().await?;

        let season = season_repository::fetch_active_season(&mut transaction)
            .await?
            .ok_or_else(|| PicksError::not_found("season", "active"))?;

        if archive_repository::archive_exists(&mut transaction, &season.label).await? {
            return Err(PicksError::conflict(format!(
                "Season {} is already archived",
                season.label
            )));
        }

        let next_label = season.label.successor()?;

        let games = game_repository::fetch_season_games(&mut transaction, season.id).await?;
        let users = user_repository::fetch_users(&mut transaction).await?;
        let picks = pick_repository::fetch_season_picks(&mut transaction, season.id).await?;

        let archived_games = snapshot_games(&games, &users, &picks)?;
        let standings = to_ranked(&rank_standings(&users, &picks));

        let archive = archive_repository::insert_archive(
            &mut transaction,
            &season.label,
            &archived_games,
            &standings,
            now,
        )
        .await?;

        season_repository::deactivate_season(&mut transaction, season.id).await?;
        let next_season =
            season_repository::insert_active_season(&mut transaction, &next_label, now).await?;

        transaction.commit().await?;

        info!(
            "Archived season {} ({} games, {} picks), {} is now active",
            season.label,
            games.len(),
            picks.len(),
            next_season.label
        );

        Ok((archive, next_season))
    }
}

/// Builds the archived form of `games`, embedding each game's picks keyed by user name.
///
/// A pick by a user missing from `users` fails the snapshot.
pub fn snapshot_games(
    games: &[Game],
    users: &[User],
    picks: &[Pick],
) -> Result<Vec<ArchivedGame>, PicksError> {
    let user_names: HashMap<_, _> = users.iter().map(|user| (user.id, user.name.as_str())).collect();

    let mut picks_by_game: HashMap<_, Vec<&Pick>> = HashMap::new();
    for pick in picks {
        picks_by_game.entry(pick.game_id).or_default().push(pick);
    }

    games
        .iter()
        .map(|game| -> Result<ArchivedGame, PicksError> {
            let mut archived_picks = std::collections::BTreeMap::new();
            for pick in picks_by_game.get(&game.id).into_iter().flatten() {
                let user_name = user_names.get(&pick.user_id).ok_or(
                    DBFromConversionError::UnknownReference {
                        entity: "user",
                        id: pick.user_id.0,
                    },
                )?;

                archived_picks.insert(
                    user_name.to_string(),
                    ArchivedPick {
                        picked_team: pick.picked_team.clone(),
                        is_correct: pick.correctness.as_option(),
                    },
                );
            }

            let outcome = game.outcome.as_ref();

            Ok(ArchivedGame {
                bowl_name: game.bowl_name.clone(),
                home_team: game.home_team.clone(),
                away_team: game.away_team.clone(),
                spread: game.spread,
                over_under: game.over_under,
                start_time: game.start_time,
                is_playoff: game.is_playoff,
                winner: outcome.map(|outcome| outcome.winner.clone()),
                home_score: outcome.and_then(|outcome| outcome.home_score),
                away_score: outcome.and_then(|outcome| outcome.away_score),
                picks: archived_picks,
            })
        })
        .collect()
}
