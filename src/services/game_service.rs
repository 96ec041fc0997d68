use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::{
    clock::Clock,
    error::PicksError,
    models::{Game, GameDetailsUpdate, GameId, GameOutcome, GameView, NewGame},
    repository::{game_repository, pick_repository, season_repository},
    services::grading_service::{apply_outcome, check_scores},
    write_guards::WriteGuards,
};

/// Schedule, teams and odds of the games in the active season.
pub struct GameService {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    guards: Arc<WriteGuards>,
}

impl GameService {
    pub fn new(pool: Pool<Sqlite>, clock: Arc<dyn Clock>, guards: Arc<WriteGuards>) -> GameService {
        GameService {
            pool,
            clock,
            guards,
        }
    }

    pub async fn list_active_games(&self) -> Result<Vec<GameView>, PicksError> {
        let mut transaction = self.pool.begin().await?;

        let season = season_repository::fetch_active_season(&mut transaction)
            .await?
            .ok_or_else(|| PicksError::not_found("season", "active"))?;
        let games = game_repository::fetch_season_games(&mut transaction, season.id).await?;

        transaction.commit().await?;

        let now = self.clock.now();
        Ok(games.into_iter().map(|game| GameView::new(game, now)).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_game(&self, new_game: NewGame) -> Result<Game, PicksError> {
        validate_new_game(&new_game)?;

        let _guard = self.guards.lock_season_shared().await;
        let now = self.clock.now();

        let mut transaction = self.pool.begin().await?;

        let season = season_repository::fetch_active_season(&mut transaction)
            .await?
            .ok_or_else(|| PicksError::not_found("season", "active"))?;
        let game = game_repository::insert_game(&mut transaction, season.id, &new_game, now).await?;

        transaction.commit().await?;

        info!(
            "Added {} ({} vs {}) to season {}",
            game.bowl_name, game.home_team, game.away_team, season.label
        );

        Ok(game)
    }

    /// Applies schedule, team and odds changes. With an `outcome`, also records the result and
    /// grades the picks against the edited game, all in one transaction.
    #[tracing::instrument(skip(self))]
    pub async fn update_game(
        &self,
        game_id: GameId,
        update: GameDetailsUpdate,
        outcome: Option<GameOutcome>,
    ) -> Result<Game, PicksError> {
        let _guard = self.guards.lock_game(game_id).await;
        let now = self.clock.now();

        let mut transaction = self.pool.begin().await?;

        let mut game = game_repository::fetch_game(&mut transaction, game_id)
            .await?
            .ok_or_else(|| PicksError::not_found("game", game_id))?;

        if let Some(bowl_name) = update.bowl_name {
            game.bowl_name = bowl_name;
        }
        if let Some(home_team) = update.home_team {
            game.home_team = home_team;
        }
        if let Some(away_team) = update.away_team {
            game.away_team = away_team;
        }
        if update.spread.is_some() {
            game.spread = update.spread;
        }
        if update.over_under.is_some() {
            game.over_under = update.over_under;
        }
        if update.start_time.is_some() {
            game.start_time = update.start_time;
        }
        if let Some(is_playoff) = update.is_playoff {
            game.is_playoff = is_playoff;
        }
        validate_teams(&game.home_team, &game.away_team)?;
        game.updated_at = now;

        match outcome {
            Some(outcome) => {
                let graded = apply_outcome(&mut transaction, &mut game, outcome, now).await?;
                transaction.commit().await?;
                info!("Updated {} and graded {graded} picks on it", game.bowl_name);
            }
            None => {
                game_repository::save_game(&mut transaction, &game).await?;
                transaction.commit().await?;
            }
        }

        Ok(game)
    }

    /// Deletes a game together with all picks on it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_game(&self, game_id: GameId) -> Result<(), PicksError> {
        let _guard = self.guards.lock_game(game_id).await;

        let mut transaction = self.pool.begin().await?;

        let picks = pick_repository::delete_game_picks(&mut transaction, game_id).await?;
        if !game_repository::delete_game(&mut transaction, game_id).await? {
            return Err(PicksError::not_found("game", game_id));
        }

        transaction.commit().await?;

        info!("Deleted game {game_id} and {picks} picks on it");

        Ok(())
    }
}

/// Checks a game before it is added: two distinct teams, and an outcome naming one of them.
pub fn validate_new_game(new_game: &NewGame) -> Result<(), PicksError> {
    validate_teams(&new_game.home_team, &new_game.away_team)?;

    if let Some(outcome) = &new_game.outcome {
        check_scores(outcome.home_score, outcome.away_score)?;
        if outcome.winner != new_game.home_team && outcome.winner != new_game.away_team {
            return Err(PicksError::InvalidSelection {
                team: outcome.winner.clone(),
                home_team: new_game.home_team.clone(),
                away_team: new_game.away_team.clone(),
            });
        }
    }

    Ok(())
}

fn validate_teams(home_team: &str, away_team: &str) -> Result<(), PicksError> {
    if home_team.trim().is_empty() || away_team.trim().is_empty() {
        return Err(PicksError::InvalidInput(
            "Both teams must be named".to_string(),
        ));
    }
    if home_team == away_team {
        return Err(PicksError::InvalidInput(format!(
            "A game needs two different teams, got `{home_team}` twice"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_log::test;
    use time::Duration;

    use crate::{
        error::PicksError,
        models::{Correctness, GameDetailsUpdate, GameOutcome},
        services::test_support::{new_game, Fixture},
    };

    #[test(tokio::test)]
    async fn listed_games_carry_a_live_lock() {
        let fixture = Fixture::new().await;
        let early = fixture.add_game("Alabama", "Oklahoma", Some(Duration::hours(1))).await;
        fixture.add_game("Texas", "Michigan", Some(Duration::hours(5))).await;
        fixture.add_game("Ohio", "Miami", None).await;

        fixture.clock.advance(Duration::hours(2));

        let games = fixture.games.list_active_games().await.unwrap();
        let locked: Vec<(&str, bool)> = games
            .iter()
            .map(|game| (game.home_team.as_str(), game.is_locked))
            .collect();

        assert_eq!(
            locked,
            vec![("Ohio", false), ("Alabama", true), ("Texas", false)]
        );
        assert_eq!(games[1].id, early.id);
    }

    #[test(tokio::test)]
    async fn kickoff_can_be_rescheduled_before_it_passes() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", Some(Duration::hours(1))).await;

        let later = fixture.clock_now() + Duration::days(1);
        let updated = fixture
            .games
            .update_game(
                game.id,
                GameDetailsUpdate {
                    start_time: Some(later),
                    spread: Some(-6.5),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.start_time, Some(later));
        assert_eq!(updated.spread, Some(-6.5));
        assert_eq!(updated.over_under, None);

        fixture.clock.advance(Duration::hours(2));
        fixture.picks.submit_pick("John", game.id, "Alabama").await.unwrap();
    }

    #[test(tokio::test)]
    async fn game_needs_two_distinct_teams() {
        let fixture = Fixture::new().await;

        let err = fixture
            .games
            .create_game(new_game("Alabama", "Alabama", None))
            .await
            .unwrap_err();
        assert!(matches!(err, PicksError::InvalidInput(_)), "{err:?}");

        let game = fixture.add_game("Alabama", "Oklahoma", None).await;
        let err = fixture
            .games
            .update_game(
                game.id,
                GameDetailsUpdate {
                    away_team: Some("Alabama".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PicksError::InvalidInput(_)), "{err:?}");
    }

    #[test(tokio::test)]
    async fn created_outcome_must_name_a_team() {
        let fixture = Fixture::new().await;
        let mut game = new_game("Alabama", "Oklahoma", None);
        game.outcome = Some(GameOutcome {
            winner: "Texas".to_string(),
            home_score: None,
            away_score: None,
        });

        let err = fixture.games.create_game(game).await.unwrap_err();
        assert!(matches!(err, PicksError::InvalidSelection { .. }), "{err:?}");
    }

    #[test(tokio::test)]
    async fn deleting_a_game_removes_its_picks() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;
        let kept = fixture.add_game("Texas", "Michigan", None).await;
        fixture.picks.submit_pick("John", game.id, "Alabama").await.unwrap();
        fixture.picks.submit_pick("John", kept.id, "Texas").await.unwrap();

        fixture.games.delete_game(game.id).await.unwrap();

        let picks = fixture.season_picks().await;
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].game_id, kept.id);

        let err = fixture.games.delete_game(game.id).await.unwrap_err();
        assert!(matches!(err, PicksError::NotFound { .. }), "{err:?}");
    }

    #[test(tokio::test)]
    async fn listing_without_active_season_is_not_found() {
        let fixture = Fixture::new().await;
        sqlx::query("UPDATE seasons SET is_active = FALSE")
            .execute(&fixture.pool)
            .await
            .unwrap();

        let err = fixture.games.list_active_games().await.unwrap_err();
        assert!(matches!(err, PicksError::NotFound { entity: "season", .. }), "{err:?}");
    }

    #[test(tokio::test)]
    async fn edits_and_result_are_saved_together() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;
        fixture.picks.submit_pick("John", game.id, "Oklahoma").await.unwrap();

        let updated = fixture
            .games
            .update_game(
                game.id,
                GameDetailsUpdate {
                    bowl_name: Some("Rose Bowl".to_string()),
                    ..Default::default()
                },
                Some(GameOutcome {
                    winner: "Oklahoma".to_string(),
                    home_score: Some(17),
                    away_score: Some(20),
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.bowl_name, "Rose Bowl");

        let stored = fixture.game(game.id).await;
        assert_eq!(stored.bowl_name, "Rose Bowl");
        assert_eq!(stored.outcome.map(|outcome| outcome.winner).as_deref(), Some("Oklahoma"));

        let picks = fixture.season_picks().await;
        assert!(picks[0].locked);
        assert_eq!(picks[0].correctness, Correctness::Correct);
    }

    #[test(tokio::test)]
    async fn invalid_winner_leaves_the_game_untouched() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;

        let err = fixture
            .games
            .update_game(
                game.id,
                GameDetailsUpdate {
                    bowl_name: Some("Renamed Bowl".to_string()),
                    spread: Some(-7.5),
                    ..Default::default()
                },
                Some(GameOutcome {
                    winner: "Texas".to_string(),
                    home_score: None,
                    away_score: None,
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PicksError::InvalidSelection { .. }), "{err:?}");

        let stored = fixture.game(game.id).await;
        assert_eq!(stored.bowl_name, game.bowl_name);
        assert_eq!(stored.spread, None);
        assert!(!stored.is_final());
    }

    #[test(tokio::test)]
    async fn winner_is_checked_against_the_edited_teams() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;

        let updated = fixture
            .games
            .update_game(
                game.id,
                GameDetailsUpdate {
                    away_team: Some("Texas".to_string()),
                    ..Default::default()
                },
                Some(GameOutcome {
                    winner: "Texas".to_string(),
                    home_score: None,
                    away_score: None,
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.away_team, "Texas");
        assert!(updated.is_final());
    }
}
