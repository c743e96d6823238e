use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::digest::generator::{generate_on_demand_digest, run_scheduled_digest};
use crate::errors::AppError;
use crate::models::digest::DigestVersion;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DigestListResponse {
    pub digests: Vec<DigestVersion>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledStatus {
    Created,
    Skipped,
}

#[derive(Serialize)]
pub struct ScheduledDigestResponse {
    pub status: ScheduledStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestVersion>,
}

/// GET /api/v1/digests
pub async fn handle_list_digests(
    State(state): State<AppState>,
) -> Result<Json<DigestListResponse>, AppError> {
    let digests = state.store.list_digests(state.config.user_id).await?;
    Ok(Json(DigestListResponse { digests }))
}

/// POST /api/v1/digests
pub async fn handle_generate_digest(
    State(state): State<AppState>,
) -> Result<Json<DigestVersion>, AppError> {
    let digest = generate_on_demand_digest(
        state.store.as_ref(),
        state.synthesizer.as_ref(),
        &state.config.policy,
        state.config.user_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(digest))
}

/// GET /api/v1/digests/scheduled
///
/// Called by an external cron. Skips (disabled, already sent today, no profile,
/// too few recent likes) are successful responses carrying the reason.
pub async fn handle_scheduled_digest(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ScheduledDigestResponse>, AppError> {
    authorize_cron(state.config.cron_secret.as_deref(), &headers)?;

    let result = run_scheduled_digest(
        state.store.as_ref(),
        state.synthesizer.as_ref(),
        &state.config.policy,
        state.config.user_id,
        Utc::now(),
    )
    .await;

    match result {
        Ok(digest) => Ok(Json(ScheduledDigestResponse {
            status: ScheduledStatus::Created,
            reason: None,
            digest: Some(digest),
        })),
        Err(
            AppError::AlreadySatisfied(reason)
            | AppError::InsufficientData(reason)
            | AppError::NotFound(reason),
        ) => {
            tracing::info!("Scheduled digest skipped: {reason}");
            Ok(Json(ScheduledDigestResponse {
                status: ScheduledStatus::Skipped,
                reason: Some(reason),
                digest: None,
            }))
        }
        Err(e) => Err(e),
    }
}

/// With no secret configured the endpoint is open.
pub fn authorize_cron(secret: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == secret => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}
