mod archive;
mod game;
mod pick;
mod season;
mod standing;
mod user;

pub mod types;

pub use archive::{ArchiveId, ArchiveSummary, ArchivedGame, ArchivedPick, ArchivedSeason};
pub use game::{is_locked, Game, GameDetailsUpdate, GameId, GameOutcome, GameView, NewGame};
pub use pick::{Correctness, NewPick, Pick, PickId, PickView};
pub use season::{Season, SeasonId, SeasonSummary};
pub use standing::{RankedStanding, Standing};
pub use user::{User, UserId};
