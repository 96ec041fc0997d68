use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error::ApiError, extract::Authenticated, AppState};
use crate::{
    auth::IssuedToken,
    error::PicksError,
    models::{
        types::SeasonLabel, ArchiveSummary, ArchivedSeason, GameDetailsUpdate, GameId, GameOutcome,
        GameView, NewGame, PickView, SeasonSummary, Standing, User,
    },
    services::{ImportSummary, OddsSummary, OddsUpdate},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Unwraps a JSON body, turning a malformed one into an input error.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload.map_err(PicksError::from)?;
    Ok(value)
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Bowl Picks API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": state.clock.now(),
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<IssuedToken> {
    let request = body(payload)?;
    Ok(Json(state.auth.login(&request.password)?))
}

pub async fn verify(_: Authenticated) -> Json<Value> {
    Json(json!({ "valid": true }))
}

pub async fn list_games(_: Authenticated, State(state): State<AppState>) -> ApiResult<Vec<GameView>> {
    Ok(Json(state.games.list_active_games().await?))
}

pub async fn create_game(
    _: Authenticated,
    State(state): State<AppState>,
    payload: Result<Json<NewGame>, JsonRejection>,
) -> ApiResult<GameView> {
    let game = state.games.create_game(body(payload)?).await?;
    Ok(Json(GameView::new(game, state.clock.now())))
}

#[derive(Deserialize)]
pub struct GameUpdateRequest {
    #[serde(flatten)]
    details: GameDetailsUpdate,
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    home_score: Option<i64>,
    #[serde(default)]
    away_score: Option<i64>,
}

/// Edits a game. A `winner` in the body records the result and grades the picks in the same
/// transaction as the edits.
pub async fn update_game(
    _: Authenticated,
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    payload: Result<Json<GameUpdateRequest>, JsonRejection>,
) -> ApiResult<GameView> {
    let request = body(payload)?;
    if request.winner.is_none() && (request.home_score.is_some() || request.away_score.is_some()) {
        return Err(PicksError::InvalidInput(
            "Scores can only be recorded together with a winner".to_string(),
        )
        .into());
    }

    let outcome = request.winner.map(|winner| GameOutcome {
        winner,
        home_score: request.home_score,
        away_score: request.away_score,
    });
    let game = match outcome {
        Some(outcome) if request.details.is_empty() => {
            state
                .grading
                .record_result(game_id, &outcome.winner, outcome.home_score, outcome.away_score)
                .await?;
            state
                .game_reader
                .get_game(game_id)
                .await?
                .ok_or_else(|| PicksError::not_found("game", game_id))?
        }
        outcome => state.games.update_game(game_id, request.details, outcome).await?,
    };

    Ok(Json(GameView::new(game, state.clock.now())))
}

pub async fn delete_game(
    _: Authenticated,
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> ApiResult<Value> {
    state.games.delete_game(game_id).await?;
    Ok(Json(json!({ "message": format!("Game {game_id} deleted") })))
}

pub async fn list_users(_: Authenticated, State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(Json(state.users.list_users().await?))
}

/// Picks of the active season, empty when there is no active season.
pub async fn list_picks(_: Authenticated, State(state): State<AppState>) -> ApiResult<Vec<PickView>> {
    let Some(season) = state.seasons.active_season().await? else {
        return Ok(Json(Vec::new()));
    };

    let picks = state
        .pick_views
        .list_season_picks(season.id, state.clock.now())
        .await?;
    Ok(Json(picks))
}

#[derive(Deserialize)]
pub struct PickRequest {
    game_id: GameId,
    user_name: String,
    picked_team: String,
}

pub async fn submit_pick(
    _: Authenticated,
    State(state): State<AppState>,
    payload: Result<Json<PickRequest>, JsonRejection>,
) -> ApiResult<PickView> {
    let request = body(payload)?;
    let pick = state
        .picks
        .submit_pick(&request.user_name, request.game_id, &request.picked_team)
        .await?;

    Ok(Json(PickView {
        id: pick.id,
        game_id: pick.game_id,
        user_name: request.user_name,
        picked_team: pick.picked_team,
        is_locked: pick.locked,
        is_correct: pick.correctness,
    }))
}

pub async fn leaderboard(_: Authenticated, State(state): State<AppState>) -> ApiResult<Vec<Standing>> {
    Ok(Json(state.standings.active_standings().await?))
}

pub async fn list_archives(
    _: Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Vec<ArchiveSummary>> {
    Ok(Json(state.archives.list_archives().await?))
}

pub async fn get_archive(
    _: Authenticated,
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> ApiResult<ArchivedSeason> {
    let label: SeasonLabel = label.parse()?;
    Ok(Json(state.archives.get_archive(&label).await?))
}

pub async fn create_archive(_: Authenticated, State(state): State<AppState>) -> ApiResult<Value> {
    let (archive, next) = state.archiver.archive_active_season().await?;
    Ok(Json(json!({
        "message": format!("Season {} archived", archive.label),
        "archived": archive.label,
        "new_season": next.label,
    })))
}

pub async fn list_seasons(
    _: Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Vec<SeasonSummary>> {
    Ok(Json(state.seasons.list_seasons().await?))
}

pub async fn import_games(
    _: Authenticated,
    State(state): State<AppState>,
    payload: Result<Json<Vec<NewGame>>, JsonRejection>,
) -> ApiResult<ImportSummary> {
    let candidates = body(payload)?;
    Ok(Json(state.imports.import_from(&candidates).await?))
}

pub async fn refresh_odds(
    _: Authenticated,
    State(state): State<AppState>,
    payload: Result<Json<Vec<OddsUpdate>>, JsonRejection>,
) -> ApiResult<OddsSummary> {
    let updates = body(payload)?;
    Ok(Json(state.imports.refresh_odds_from(&updates).await?))
}
