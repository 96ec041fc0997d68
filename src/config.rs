use serde::Deserialize;

use crate::models::types::SeasonLabel;

/// Settings read from the environment, e.g. `DATABASE_URL` for `database_url`.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub family_password: String,
    pub token_secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_initial_season")]
    pub initial_season: SeasonLabel,
    #[serde(default = "default_seed_users")]
    pub seed_users: Vec<String>,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn token_ttl(&self) -> time::Duration {
        time::Duration::minutes(self.token_ttl_minutes)
    }
}

// SQLite has a single writer, more connections only help readers.
fn default_max_connections() -> u32 {
    1
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    60 * 24 * 7
}

fn default_initial_season() -> SeasonLabel {
    SeasonLabel::starting_in(2024)
}

fn default_seed_users() -> Vec<String> {
    ["John", "Jean", "Emily", "Sarah", "Matt", "Billy", "Papa Jack", "Coconut"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn default_cors_origins() -> Vec<String> {
    ["http://localhost:5173", "http://localhost:3000", "http://127.0.0.1:5173"]
        .iter()
        .map(|origin| origin.to_string())
        .collect()
}
