pub mod archive_service;
pub mod game_service;
pub mod grading_service;
pub mod import_service;
pub mod pick_service;
pub mod standings_service;

#[cfg(test)]
pub mod test_support;

pub use archive_service::ArchiveService;
pub use game_service::GameService;
pub use grading_service::GradingService;
pub use import_service::{ImportService, ImportSummary, OddsSummary, OddsUpdate};
pub use pick_service::PickService;
pub use standings_service::StandingsService;
