use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use crate::{
    clock::Clock,
    error::PicksError,
    models::{GameId, NewPick, Pick},
    repository::{game_repository, pick_repository, user_repository},
    write_guards::WriteGuards,
};

pub struct PickService {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    guards: Arc<WriteGuards>,
}

impl PickService {
    pub fn new(pool: Pool<Sqlite>, clock: Arc<dyn Clock>, guards: Arc<WriteGuards>) -> PickService {
        PickService {
            pool,
            clock,
            guards,
        }
    }

    /// Records `user_name`'s pick of `chosen_team` for a game, replacing an earlier unlocked pick.
    #[tracing::instrument(skip(self))]
    pub async fn submit_pick(
        &self,
        user_name: &str,
        game_id: GameId,
        chosen_team: &str,
    ) -> Result<Pick, PicksError> {
        let _guard = self.guards.lock_game(game_id).await;
        let now = self.clock.now();

        let mut transaction = self.pool.begin().await?;

        let user = user_repository::fetch_user_by_name(&mut transaction, user_name)
            .await?
            .ok_or_else(|| PicksError::not_found("user", user_name))?;

        let game = game_repository::fetch_game(&mut transaction, game_id)
            .await?
            .ok_or_else(|| PicksError::not_found("game", game_id))?;

        if game.is_locked(now) || game.is_final() {
            return Err(PicksError::GameLocked(game.id));
        }

        if !game.has_team(chosen_team) {
            return Err(PicksError::InvalidSelection {
                team: chosen_team.to_string(),
                home_team: game.home_team,
                away_team: game.away_team,
            });
        }

        let pick = match pick_repository::fetch_pick(&mut transaction, user.id, game.id).await? {
            Some(existing) if existing.locked => return Err(PicksError::GameLocked(game.id)),

            Some(existing) => {
                debug!(
                    "Replacing pick {:?}: {} -> {}",
                    existing.id, existing.picked_team, chosen_team
                );
                pick_repository::update_picked_team(&mut transaction, existing.id, chosen_team, now)
                    .await?
                    .ok_or(PicksError::GameLocked(game.id))?
            }

            None => {
                let new_pick = NewPick {
                    user_id: user.id,
                    game_id: game.id,
                    picked_team: chosen_team.to_string(),
                    submitted_at: now,
                };
                pick_repository::insert_pick(&mut transaction, &new_pick).await?
            }
        };

        transaction.commit().await?;

        info!(
            "{} picked {} in {} ({} vs {})",
            user.name, pick.picked_team, game.bowl_name, game.home_team, game.away_team
        );

        Ok(pick)
    }
}
