mod season_label;
mod utc_datetime;

pub use season_label::{InvalidSeasonLabel, SeasonLabel};
pub use utc_datetime::UtcDateTime;
