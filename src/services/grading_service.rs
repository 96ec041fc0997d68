use std::sync::Arc;

use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::info;

use crate::{
    clock::Clock,
    error::PicksError,
    models::{types::UtcDateTime, Game, GameId, GameOutcome},
    repository::{game_repository, pick_repository},
    write_guards::WriteGuards,
};

pub struct GradingService {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    guards: Arc<WriteGuards>,
}

impl GradingService {
    pub fn new(
        pool: Pool<Sqlite>,
        clock: Arc<dyn Clock>,
        guards: Arc<WriteGuards>,
    ) -> GradingService {
        GradingService {
            pool,
            clock,
            guards,
        }
    }

    /// Records the final result of a game and grades every pick on it from scratch.
    ///
    /// Recording a different winner later regrades all picks against the new winner.
    /// Returns the number of picks graded.
    #[tracing::instrument(skip(self))]
    pub async fn record_result(
        &self,
        game_id: GameId,
        winner: &str,
        home_score: Option<i64>,
        away_score: Option<i64>,
    ) -> Result<u64, PicksError> {
        let _guard = self.guards.lock_game(game_id).await;
        let now = self.clock.now();

        let mut transaction = self.pool.begin().await?;

        let mut game = game_repository::fetch_game(&mut transaction, game_id)
            .await?
            .ok_or_else(|| PicksError::not_found("game", game_id))?;

        let previous_winner = game.outcome.as_ref().map(|outcome| outcome.winner.clone());

        let outcome = GameOutcome {
            winner: winner.to_string(),
            home_score,
            away_score,
        };
        let graded = apply_outcome(&mut transaction, &mut game, outcome, now).await?;

        transaction.commit().await?;

        match previous_winner {
            Some(previous) if previous != winner => info!(
                "Corrected {} winner from {previous} to {winner}, regraded {graded} picks",
                game.bowl_name
            ),
            _ => info!("{} won {}, graded {graded} picks", winner, game.bowl_name),
        }

        Ok(graded)
    }
}

/// Sets `outcome` on `game`, saves the whole row and regrades every pick on it.
///
/// The winner is checked against the teams `game` has now, unsaved edits included.
/// An invalid winner or score fails before anything is written.
pub async fn apply_outcome(
    connection: &mut SqliteConnection,
    game: &mut Game,
    outcome: GameOutcome,
    now: UtcDateTime,
) -> Result<u64, PicksError> {
    check_scores(outcome.home_score, outcome.away_score)?;
    if !game.has_team(&outcome.winner) {
        return Err(PicksError::InvalidSelection {
            team: outcome.winner,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
        });
    }

    let winner = outcome.winner.clone();
    game.outcome = Some(outcome);
    game.updated_at = now;
    game_repository::save_game(&mut *connection, game).await?;

    pick_repository::grade_game_picks(&mut *connection, game.id, &winner, now).await
}

/// Scores are stored as small non-negative numbers.
pub fn check_scores(home_score: Option<i64>, away_score: Option<i64>) -> Result<(), PicksError> {
    for score in [home_score, away_score].into_iter().flatten() {
        if !(0..=i64::from(u16::MAX)).contains(&score) {
            return Err(PicksError::InvalidInput(format!(
                "Score out of range: {score}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_log::test;
    use time::Duration;

    use crate::{
        error::PicksError,
        models::{Correctness, GameId},
        services::test_support::Fixture,
    };

    fn graded(picked_team: &str, winner: &str) -> Correctness {
        if picked_team == winner {
            Correctness::Correct
        } else {
            Correctness::Incorrect
        }
    }

    #[test(tokio::test)]
    async fn every_pick_is_graded_and_locked() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", Some(Duration::days(1))).await;

        fixture.picks.submit_pick("John", game.id, "Oklahoma").await.unwrap();
        fixture.picks.submit_pick("Jean", game.id, "Alabama").await.unwrap();
        fixture.picks.submit_pick("Emily", game.id, "Alabama").await.unwrap();

        let count = fixture
            .grading
            .record_result(game.id, "Alabama", Some(24), Some(10))
            .await
            .unwrap();
        assert_eq!(count, 3);

        for pick in fixture.season_picks().await {
            assert!(pick.locked);
            assert_eq!(
                pick.correctness,
                graded(&pick.picked_team, "Alabama"),
                "{pick:?}"
            );
        }

        let stored = fixture.game(game.id).await;
        let outcome = stored.outcome.unwrap();
        assert_eq!(outcome.winner, "Alabama");
        assert_eq!((outcome.home_score, outcome.away_score), (Some(24), Some(10)));
    }

    #[test(tokio::test)]
    async fn regrading_is_a_full_recompute() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;

        fixture.picks.submit_pick("John", game.id, "Oklahoma").await.unwrap();
        fixture.picks.submit_pick("Jean", game.id, "Alabama").await.unwrap();

        fixture.grading.record_result(game.id, "Alabama", None, None).await.unwrap();
        fixture.grading.record_result(game.id, "Alabama", None, None).await.unwrap();
        let after_repeat = fixture.season_picks().await;

        fixture.grading.record_result(game.id, "Oklahoma", Some(27), Some(31)).await.unwrap();
        let after_correction = fixture.season_picks().await;

        for pick in &after_repeat {
            assert_eq!(pick.correctness, graded(&pick.picked_team, "Alabama"));
        }
        for pick in &after_correction {
            assert!(pick.locked);
            assert_eq!(pick.correctness, graded(&pick.picked_team, "Oklahoma"));
        }
    }

    #[test(tokio::test)]
    async fn other_games_keep_their_picks_pending() {
        let fixture = Fixture::new().await;
        let graded_game = fixture.add_game("Alabama", "Oklahoma", None).await;
        let other_game = fixture.add_game("Texas", "Michigan", None).await;

        fixture.picks.submit_pick("John", graded_game.id, "Oklahoma").await.unwrap();
        let other = fixture.picks.submit_pick("John", other_game.id, "Texas").await.unwrap();

        let count = fixture
            .grading
            .record_result(graded_game.id, "Oklahoma", None, None)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let picks = fixture.season_picks().await;
        let untouched = picks.iter().find(|pick| pick.id == other.id).unwrap();
        assert_eq!(untouched.correctness, Correctness::Pending);
        assert!(!untouched.locked);
    }

    #[test(tokio::test)]
    async fn game_without_picks_grades_nothing() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;

        let count = fixture
            .grading
            .record_result(game.id, "Oklahoma", Some(3), Some(7))
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(fixture.game(game.id).await.is_final());
    }

    #[test(tokio::test)]
    async fn winner_must_be_one_of_the_teams() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;
        fixture.picks.submit_pick("John", game.id, "Oklahoma").await.unwrap();

        let err = fixture
            .grading
            .record_result(game.id, "Texas", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PicksError::InvalidSelection { .. }), "{err:?}");

        // Nothing was written.
        assert!(!fixture.game(game.id).await.is_final());
        assert_eq!(fixture.season_picks().await[0].correctness, Correctness::Pending);
    }

    #[test(tokio::test)]
    async fn unknown_game_is_not_found() {
        let fixture = Fixture::new().await;

        let err = fixture
            .grading
            .record_result(GameId(404), "Alabama", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PicksError::NotFound { entity: "game", .. }), "{err:?}");
    }

    #[test(tokio::test)]
    async fn negative_scores_are_rejected() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", None).await;

        let err = fixture
            .grading
            .record_result(game.id, "Alabama", Some(-1), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, PicksError::InvalidInput(_)), "{err:?}");
    }

    #[test(tokio::test)]
    async fn submission_and_grading_on_one_game_do_not_interleave() {
        let fixture = Fixture::new().await;
        let game = fixture.add_game("Alabama", "Oklahoma", Some(Duration::days(1))).await;

        // Both writers queue up behind the held game lock and then run one after the other.
        let held = fixture.guards.lock_game(game.id).await;
        let release = async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            drop(held);
        };

        let (submitted, count, ()) = tokio::join!(
            fixture.picks.submit_pick("John", game.id, "Oklahoma"),
            fixture.grading.record_result(game.id, "Alabama", None, None),
            release,
        );
        let count = count.unwrap();
        let picks = fixture.season_picks().await;

        match submitted {
            Ok(_) => {
                assert_eq!(count, 1);
                assert_eq!(picks.len(), 1);
                assert!(picks[0].locked);
                assert_eq!(picks[0].correctness, graded("Oklahoma", "Alabama"));
            }
            Err(PicksError::GameLocked(locked)) => {
                assert_eq!(locked, game.id);
                assert_eq!(count, 0);
                assert!(picks.is_empty());
            }
            Err(err) => panic!("Unexpected submission failure: {err:?}"),
        }
    }
}
