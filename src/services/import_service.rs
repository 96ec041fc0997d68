use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    error::PicksError,
    models::NewGame,
    repository::{game_repository, season_repository},
    services::game_service::validate_new_game,
    write_guards::WriteGuards,
};

/// Supplies candidate games, e.g. a feed of the bowl schedule.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn fetch_games(&self) -> anyhow::Result<Vec<NewGame>>;
}

/// Supplies betting lines for games.
#[async_trait]
pub trait OddsProvider: Send + Sync {
    async fn fetch_odds(&self) -> anyhow::Result<Vec<OddsUpdate>>;
}

/// A batch that was already fetched, e.g. posted by an admin.
#[async_trait]
impl ScheduleProvider for Vec<NewGame> {
    async fn fetch_games(&self) -> anyhow::Result<Vec<NewGame>> {
        Ok(self.clone())
    }
}

#[async_trait]
impl OddsProvider for Vec<OddsUpdate> {
    async fn fetch_odds(&self) -> anyhow::Result<Vec<OddsUpdate>> {
        Ok(self.clone())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct OddsUpdate {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub over_under: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: u64,
    pub total_fetched: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OddsSummary {
    pub updated: u64,
}

pub struct ImportService {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    guards: Arc<WriteGuards>,
}

impl ImportService {
    pub fn new(pool: Pool<Sqlite>, clock: Arc<dyn Clock>, guards: Arc<WriteGuards>) -> ImportService {
        ImportService {
            pool,
            clock,
            guards,
        }
    }

    /// Adds the candidates whose (home, away) pairing is not in the active season yet.
    #[tracing::instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn import_games(&self, candidates: &[NewGame]) -> Result<ImportSummary, PicksError> {
        let _guard = self.guards.lock_season_shared().await;
        let now = self.clock.now();

        let mut transaction = self.pool.begin().await?;

        let season = season_repository::fetch_active_season(&mut transaction)
            .await?
            .ok_or_else(|| PicksError::not_found("season", "active"))?;

        let mut imported = 0;
        for candidate in candidates {
            if let Err(err) = validate_new_game(candidate) {
                warn!("Skipping candidate {}: {err}", candidate.bowl_name);
                continue;
            }

            let existing = game_repository::find_game_by_teams(
                &mut transaction,
                season.id,
                &candidate.home_team,
                &candidate.away_team,
            )
            .await?;

            if existing.is_some() {
                debug!(
                    "Skipping {} vs {}, already scheduled",
                    candidate.home_team, candidate.away_team
                );
                continue;
            }

            game_repository::insert_game(&mut transaction, season.id, candidate, now).await?;
            imported += 1;
        }

        transaction.commit().await?;

        info!(
            "Imported {imported} of {} candidate games into season {}",
            candidates.len(),
            season.label
        );

        Ok(ImportSummary {
            imported,
            total_fetched: candidates.len() as u64,
        })
    }

    /// Writes the lines of every update that matches a game of the active season.
    ///
    /// Only the odds columns are written; schedule, teams and results stay as stored.
    #[tracing::instrument(skip(self, updates), fields(updates = updates.len()))]
    pub async fn apply_odds(&self, updates: &[OddsUpdate]) -> Result<OddsSummary, PicksError> {
        let _guard = self.guards.lock_season_shared().await;
        let now = self.clock.now();

        let mut transaction = self.pool.begin().await?;

        let season = season_repository::fetch_active_season(&mut transaction)
            .await?
            .ok_or_else(|| PicksError::not_found("season", "active"))?;

        let mut updated = 0;
        for update in updates {
            let Some(game) = game_repository::find_game_by_teams(
                &mut transaction,
                season.id,
                &update.home_team,
                &update.away_team,
            )
            .await?
            else {
                debug!("No game for odds on {} vs {}", update.home_team, update.away_team);
                continue;
            };

            if game_repository::update_odds(
                &mut transaction,
                game.id,
                update.spread,
                update.over_under,
                now,
            )
            .await?
            {
                updated += 1;
            }
        }

        transaction.commit().await?;

        info!("Updated odds for {updated} games");

        Ok(OddsSummary { updated })
    }

    /// Pulls games from `provider`. A failing provider results in nothing imported.
    pub async fn import_from(
        &self,
        provider: &dyn ScheduleProvider,
    ) -> Result<ImportSummary, PicksError> {
        match provider.fetch_games().await {
            Ok(candidates) => self.import_games(&candidates).await,
            Err(err) => {
                warn!("Could not fetch games, nothing imported: {err:#}");
                Ok(ImportSummary::default())
            }
        }
    }

    /// Pulls odds from `provider`. A failing provider results in nothing updated.
    pub async fn refresh_odds_from(
        &self,
        provider: &dyn OddsProvider,
    ) -> Result<OddsSummary, PicksError> {
        match provider.fetch_odds().await {
            Ok(updates) => self.apply_odds(&updates).await,
            Err(err) => {
                warn!("Could not fetch odds, nothing updated: {err:#}");
                Ok(OddsSummary::default())
            }
        }
    }
}
