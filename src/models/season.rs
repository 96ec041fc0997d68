use serde::Serialize;

use super::types::{SeasonLabel, UtcDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SeasonId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Season {
    pub id: SeasonId,
    pub label: SeasonLabel,
    pub is_active: bool,
    pub created_at: UtcDateTime,
}

/// A season as listed next to the archives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeasonSummary {
    pub label: SeasonLabel,
    pub is_active: bool,
    pub is_archived: bool,
}
