mod error;
mod extract;
mod handlers;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use sqlx::{Pool, Sqlite};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{
    auth::AuthGate,
    clock::Clock,
    repository::{ArchiveRepository, GameRepository, PickRepository, SeasonRepository, UserRepository},
    services::{
        ArchiveService, GameService, GradingService, ImportService, PickService, StandingsService,
    },
    write_guards::WriteGuards,
};

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthGate>,
    pub clock: Arc<dyn Clock>,
    pub games: Arc<GameService>,
    pub picks: Arc<PickService>,
    pub grading: Arc<GradingService>,
    pub standings: Arc<StandingsService>,
    pub archiver: Arc<ArchiveService>,
    pub imports: Arc<ImportService>,
    pub game_reader: Arc<GameRepository>,
    pub users: Arc<UserRepository>,
    pub seasons: Arc<SeasonRepository>,
    pub pick_views: Arc<PickRepository>,
    pub archives: Arc<ArchiveRepository>,
}

impl AppState {
    pub fn new(pool: Pool<Sqlite>, clock: Arc<dyn Clock>, auth: AuthGate) -> AppState {
        let guards = Arc::new(WriteGuards::default());

        AppState {
            auth: Arc::new(auth),
            games: Arc::new(GameService::new(pool.clone(), clock.clone(), guards.clone())),
            picks: Arc::new(PickService::new(pool.clone(), clock.clone(), guards.clone())),
            grading: Arc::new(GradingService::new(pool.clone(), clock.clone(), guards.clone())),
            standings: Arc::new(StandingsService::new(pool.clone())),
            archiver: Arc::new(ArchiveService::new(pool.clone(), clock.clone(), guards.clone())),
            imports: Arc::new(ImportService::new(pool.clone(), clock.clone(), guards)),
            game_reader: Arc::new(GameRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            seasons: Arc::new(SeasonRepository::new(pool.clone())),
            pick_views: Arc::new(PickRepository::new(pool.clone())),
            archives: Arc::new(ArchiveRepository::new(pool)),
            clock,
        }
    }
}

/// CORS for the given browser origins.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| origin.trim().parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Auth
        .route("/auth/login", post(handlers::login))
        .route("/auth/verify", get(handlers::verify))
        // Games
        .route("/games", get(handlers::list_games).post(handlers::create_game))
        .route("/games/:id", put(handlers::update_game).delete(handlers::delete_game))
        // Picks
        .route("/picks", get(handlers::list_picks).post(handlers::submit_pick))
        .route("/picks/users", get(handlers::list_users))
        .route("/picks/leaderboard", get(handlers::leaderboard))
        // Archive
        .route("/archive", get(handlers::list_archives))
        .route("/archive/create", post(handlers::create_archive))
        .route("/archive/seasons/all", get(handlers::list_seasons))
        .route("/archive/:label", get(handlers::get_archive))
        // Admin
        .route("/admin/import-games", post(handlers::import_games))
        .route("/admin/refresh-odds", post(handlers::refresh_odds))
        .with_state(state)
        .layer(cors)
}
