use std::collections::HashMap;

use sqlx::{Pool, Sqlite};

use crate::{
    error::PicksError,
    models::{Correctness, Pick, RankedStanding, SeasonId, Standing, User, UserId},
    repository::{pick_repository, season_repository, user_repository},
};

pub struct StandingsService {
    pool: Pool<Sqlite>,
}

impl StandingsService {
    pub fn new(pool: Pool<Sqlite>) -> StandingsService {
        StandingsService { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn standings(&self, season: SeasonId) -> Result<Vec<Standing>, PicksError> {
        let mut transaction = self.pool.begin().await?;

        let users = user_repository::fetch_users(&mut transaction).await?;
        let picks = pick_repository::fetch_season_picks(&mut transaction, season).await?;

        transaction.commit().await?;

        Ok(rank_standings(&users, &picks))
    }

    /// Standings of the active season, empty when there is no active season.
    pub async fn active_standings(&self) -> Result<Vec<Standing>, PicksError> {
        let mut connection = self.pool.acquire().await?;
        let season = season_repository::fetch_active_season(&mut connection).await?;
        drop(connection);

        match season {
            Some(season) => self.standings(season.id).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Tallies `picks` per user and orders users by correct picks, best first.
///
/// Every user gets a row. Users with the same number of correct picks keep the order of `users`.
pub fn rank_standings(users: &[User], picks: &[Pick]) -> Vec<Standing> {
    let mut tallies: HashMap<UserId, (u32, u32, u32)> = HashMap::new();
    for pick in picks {
        let (correct, total, pending) = tallies.entry(pick.user_id).or_default();
        *total += 1;
        match pick.correctness {
            Correctness::Correct => *correct += 1,
            Correctness::Pending => *pending += 1,
            Correctness::Incorrect => {}
        }
    }

    let mut standings: Vec<Standing> = users
        .iter()
        .map(|user| {
            let (correct, total, pending) = tallies.get(&user.id).copied().unwrap_or_default();

            Standing {
                user_id: user.id,
                user_name: user.name.clone(),
                correct_picks: correct,
                total_picks: total,
                pending_picks: pending,
            }
        })
        .collect();

    // Stable, so ties stay in listing order.
    standings.sort_by(|a, b| b.correct_picks.cmp(&a.correct_picks));

    standings
}

pub fn to_ranked(standings: &[Standing]) -> Vec<RankedStanding> {
    standings
        .iter()
        .zip(1..)
        .map(|(standing, rank)| RankedStanding {
            rank,
            user_name: standing.user_name.clone(),
            correct_picks: standing.correct_picks,
            total_picks: standing.total_picks,
            pending_picks: standing.pending_picks,
        })
        .collect()
}
