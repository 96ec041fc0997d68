use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    standing::RankedStanding,
    types::{SeasonLabel, UtcDateTime},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArchiveId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArchivedSeason {
    pub id: ArchiveId,
    pub label: SeasonLabel,
    pub games: Vec<ArchivedGame>,
    pub standings: Vec<RankedStanding>,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub id: ArchiveId,
    pub label: SeasonLabel,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchivedGame {
    pub bowl_name: String,
    pub home_team: String,
    pub away_team: String,
    pub spread: Option<f64>,
    pub over_under: Option<f64>,
    pub start_time: Option<UtcDateTime>,
    pub is_playoff: bool,
    pub winner: Option<String>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    /// Keyed by user name. Users who did not pick this game are absent.
    pub picks: BTreeMap<String, ArchivedPick>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedPick {
    pub picked_team: String,
    pub is_correct: Option<bool>,
}
