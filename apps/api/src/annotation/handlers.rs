use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::annotation::cache::get_or_create_annotation;
use crate::annotation::pulse::{produce_pulse, PulseRequest};
use crate::errors::AppError;
use crate::models::annotation::{Annotation, AnnotationPurpose};
use crate::state::AppState;

#[derive(Serialize)]
pub struct PulseResponse {
    pub pulse: Annotation,
    pub from_cache: bool,
}

/// POST /api/v1/annotations/pulse
pub async fn handle_pulse(
    State(state): State<AppState>,
    Json(req): Json<PulseRequest>,
) -> Result<Json<PulseResponse>, AppError> {
    req.validate()?;

    let (pulse, from_cache) = get_or_create_annotation(
        state.store.as_ref(),
        &req.item_id,
        AnnotationPurpose::Pulse,
        state.config.policy.annotation_ttl,
        Utc::now(),
        || produce_pulse(state.synthesizer.as_ref(), state.content.as_ref(), &req),
    )
    .await?;

    Ok(Json(PulseResponse { pulse, from_cache }))
}
