use std::sync::Arc;

use sqlx::SqlitePool;
use time::{macros::datetime, Duration};

use super::{
    ArchiveService, GameService, GradingService, ImportService, PickService, StandingsService,
};
use crate::{
    clock::{Clock, ManualClock},
    models::{
        types::{SeasonLabel, UtcDateTime},
        Game, GameId, NewGame, Pick, Season,
    },
    repository::{
        game_repository, pick_repository, test_pool, ArchiveRepository, PickRepository,
        SeasonRepository, UserRepository,
    },
    write_guards::WriteGuards,
};

pub const FAMILY: [&str; 8] = [
    "John", "Jean", "Emily", "Sarah", "Matt", "Billy", "Papa Jack", "Coconut",
];

/// Services over one in-memory database, seeded with the family and the 2024-25 season.
pub struct Fixture {
    pub pool: SqlitePool,
    pub clock: Arc<ManualClock>,
    pub season: Season,
    pub picks: PickService,
    pub grading: GradingService,
    pub standings: StandingsService,
    pub archiver: ArchiveService,
    pub games: GameService,
    pub imports: ImportService,
    pub seasons: SeasonRepository,
    pub archives: ArchiveRepository,
    pub pick_views: PickRepository,
    pub guards: Arc<WriteGuards>,
}

impl Fixture {
    pub async fn new() -> Fixture {
        let pool = test_pool().await;
        let clock = Arc::new(ManualClock::new(UtcDateTime::from(datetime!(2024-12-20 12:00 UTC))));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let guards = Arc::new(WriteGuards::default());

        let names: Vec<String> = FAMILY.iter().map(|name| name.to_string()).collect();
        UserRepository::new(pool.clone())
            .seed_users(&names, clock.now())
            .await
            .unwrap();

        let seasons = SeasonRepository::new(pool.clone());
        let label: SeasonLabel = "2024-25".parse().unwrap();
        let season = seasons.ensure_active_season(&label, clock.now()).await.unwrap();

        Fixture {
            picks: PickService::new(pool.clone(), dyn_clock.clone(), guards.clone()),
            grading: GradingService::new(pool.clone(), dyn_clock.clone(), guards.clone()),
            standings: StandingsService::new(pool.clone()),
            archiver: ArchiveService::new(pool.clone(), dyn_clock.clone(), guards.clone()),
            games: GameService::new(pool.clone(), dyn_clock.clone(), guards.clone()),
            imports: ImportService::new(pool.clone(), dyn_clock, guards.clone()),
            archives: ArchiveRepository::new(pool.clone()),
            pick_views: PickRepository::new(pool.clone()),
            guards,
            seasons,
            season,
            clock,
            pool,
        }
    }

    pub fn clock_now(&self) -> UtcDateTime {
        self.clock.now()
    }

    pub fn user_names(&self) -> Vec<String> {
        FAMILY.iter().map(|name| name.to_string()).collect()
    }

    /// Adds a game to the active season, kicking off `kickoff_in` from now if given.
    pub async fn add_game(&self, home: &str, away: &str, kickoff_in: Option<Duration>) -> Game {
        let start = kickoff_in.map(|offset| self.clock_now() + offset);
        self.games.create_game(new_game(home, away, start)).await.unwrap()
    }

    pub async fn game(&self, game: GameId) -> Game {
        let mut connection = self.pool.acquire().await.unwrap();
        game_repository::fetch_game(&mut connection, game)
            .await
            .unwrap()
            .unwrap()
    }

    /// Picks of the fixture's season, in insertion order.
    pub async fn season_picks(&self) -> Vec<Pick> {
        let mut connection = self.pool.acquire().await.unwrap();
        pick_repository::fetch_season_picks(&mut connection, self.season.id)
            .await
            .unwrap()
    }
}

pub fn new_game(home: &str, away: &str, start_time: Option<UtcDateTime>) -> NewGame {
    NewGame {
        bowl_name: format!("{home} vs {away} Bowl"),
        home_team: home.to_string(),
        away_team: away.to_string(),
        spread: None,
        over_under: None,
        start_time,
        is_playoff: false,
        outcome: None,
    }
}
