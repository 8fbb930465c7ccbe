// Draft endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use snakedraft_core::draft::pick::Pick;
use snakedraft_core::draft::results::DraftResults;
use snakedraft_core::draft::state::{CreateDraftRequest, RunMetrics};
use snakedraft_core::engine::{DraftSnapshot, TurnInfo};

use super::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    pub participant_id: String,
    pub player_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopickResponse {
    pub autopicked: bool,
    pub pick: Option<Pick>,
}

/// POST /drafts
pub async fn create_draft(
    State(state): State<AppState>,
    Json(request): Json<CreateDraftRequest>,
) -> Result<(StatusCode, Json<DraftSnapshot>), ApiError> {
    let snapshot = state.engine.create_draft(request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /drafts/:id
pub async fn get_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<DraftSnapshot>, ApiError> {
    Ok(Json(state.engine.get_draft(&draft_id).await?))
}

/// POST /drafts/:id/start
pub async fn start_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<DraftSnapshot>, ApiError> {
    Ok(Json(state.engine.start_draft(&draft_id, Utc::now()).await?))
}

/// GET /drafts/:id/turn
pub async fn current_turn(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<TurnInfo>, ApiError> {
    Ok(Json(state.engine.current_turn(&draft_id, Utc::now()).await?))
}

/// POST /drafts/:id/pick
pub async fn submit_pick(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
    Json(request): Json<PickRequest>,
) -> Result<(StatusCode, Json<Pick>), ApiError> {
    let pick = state
        .engine
        .apply_pick(
            &draft_id,
            &request.participant_id,
            &request.player_id,
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(pick)))
}

/// POST /drafts/:id/autopick
///
/// Fills the pick on the clock if its timer has expired or a bot holds it.
pub async fn autopick(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<AutopickResponse>, ApiError> {
    let pick = state.engine.tick(&draft_id, Utc::now()).await?;
    Ok(Json(AutopickResponse {
        autopicked: pick.is_some(),
        pick,
    }))
}

/// POST /drafts/:id/run
pub async fn run_bot_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<RunMetrics>, ApiError> {
    Ok(Json(state.engine.run_bot_draft(&draft_id).await?))
}

/// GET /drafts/:id/results
pub async fn results(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<DraftResults>, ApiError> {
    Ok(Json(state.engine.get_results(&draft_id).await?))
}

pub fn draft_routes() -> Router<AppState> {
    Router::new()
        .route("/drafts", post(create_draft))
        .route("/drafts/:id", get(get_draft))
        .route("/drafts/:id/start", post(start_draft))
        .route("/drafts/:id/turn", get(current_turn))
        .route("/drafts/:id/pick", post(submit_pick))
        .route("/drafts/:id/autopick", post(autopick))
        .route("/drafts/:id/run", post(run_bot_draft))
        .route("/drafts/:id/results", get(results))
}
