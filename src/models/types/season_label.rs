use std::{fmt, str::FromStr};

use lazy_regex::regex_captures;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A season label like `2024-25`: the year the season starts in, followed by the
/// last two digits of the following year.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeasonLabel {
    label: String,
    start_year: u32,
}

const LAST_START_YEAR: u32 = 9999;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid season label `{0}`, expected something like `2024-25`")]
pub struct InvalidSeasonLabel(pub String);

impl SeasonLabel {
    pub fn start_year(&self) -> u32 {
        self.start_year
    }

    pub fn as_str(&self) -> &str {
        &self.label
    }

    /// The season starting in `start_year`, e.g. `2024-25` for 2024.
    pub fn starting_in(start_year: u32) -> SeasonLabel {
        SeasonLabel {
            label: format!("{start_year}-{:02}", (start_year + 1) % 100),
            start_year,
        }
    }

    /// `2024-25` is followed by `2025-26`, `2099-00` by `2100-01`.
    ///
    /// Labels have four-digit years, so `9999-00` has no successor.
    pub fn successor(&self) -> Result<SeasonLabel, InvalidSeasonLabel> {
        let next = SeasonLabel::starting_in(self.start_year + 1);
        if next.start_year > LAST_START_YEAR {
            return Err(InvalidSeasonLabel(next.label));
        }
        Ok(next)
    }
}

impl FromStr for SeasonLabel {
    type Err = InvalidSeasonLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (_whole, year, _tail) = regex_captures!(r#"^([0-9]{4})-([0-9]{2})$"#, value)
            .ok_or_else(|| InvalidSeasonLabel(value.to_string()))?;

        let start_year = year
            .parse()
            .map_err(|_| InvalidSeasonLabel(value.to_string()))?;

        Ok(SeasonLabel {
            label: value.to_string(),
            start_year,
        })
    }
}

impl TryFrom<String> for SeasonLabel {
    type Error = InvalidSeasonLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeasonLabel> for String {
    fn from(value: SeasonLabel) -> Self {
        value.label
    }
}

impl fmt::Display for SeasonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
