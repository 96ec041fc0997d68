use serde::{Deserialize, Serialize};

use super::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Standing {
    #[serde(skip)]
    pub user_id: UserId,
    pub user_name: String,
    pub correct_picks: u32,
    pub total_picks: u32,
    pub pending_picks: u32,
}

/// A standings row frozen into an archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedStanding {
    pub rank: u32,
    pub user_name: String,
    pub correct_picks: u32,
    pub total_picks: u32,
    pub pending_picks: u32,
}
