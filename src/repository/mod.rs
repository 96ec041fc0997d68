mod conversion;

pub mod archive_repository;
pub mod game_repository;
pub mod pick_repository;
pub mod season_repository;
pub mod user_repository;

pub use archive_repository::ArchiveRepository;
pub use conversion::{DBFromConversionError, DBToConversionError};
pub use game_repository::GameRepository;
pub use pick_repository::PickRepository;
pub use season_repository::SeasonRepository;
pub use user_repository::UserRepository;

/// A fresh in-memory database with migrations applied.
///
/// Every connection to `sqlite::memory:` gets its own database, so the pool is capped at one.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("In-memory database should open");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Migrations should apply to an empty database");

    pool
}
