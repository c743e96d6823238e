use axum::{extract::State, Json};
use chrono::Utc;

use crate::errors::AppError;
use crate::models::counters::{PreferencesPatch, UserPreferences};
use crate::state::AppState;
use crate::swipes::recorder::{
    load_swipe_state, record_decision, update_preferences, RecordDecisionRequest,
    RecordDecisionResponse, SwipeState,
};

/// POST /api/v1/swipes
pub async fn handle_record_swipe(
    State(state): State<AppState>,
    Json(req): Json<RecordDecisionRequest>,
) -> Result<Json<RecordDecisionResponse>, AppError> {
    let response = record_decision(
        state.store.as_ref(),
        &state.config.policy,
        state.config.user_id,
        req,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

/// GET /api/v1/swipes
pub async fn handle_swipe_state(
    State(state): State<AppState>,
) -> Result<Json<SwipeState>, AppError> {
    Ok(Json(
        load_swipe_state(state.store.as_ref(), state.config.user_id).await?,
    ))
}

/// PATCH /api/v1/preferences
pub async fn handle_update_preferences(
    State(state): State<AppState>,
    Json(patch): Json<PreferencesPatch>,
) -> Result<Json<UserPreferences>, AppError> {
    let prefs = update_preferences(state.store.as_ref(), state.config.user_id, patch).await?;
    Ok(Json(prefs))
}
