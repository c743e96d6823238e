use axum::{extract::State, Json};
use serde::Serialize;

use crate::dossier::generator::generate_and_commit_profile;
use crate::dossier::versioning::render_profile_to_md;
use crate::errors::AppError;
use crate::models::profile::{ProfileKind, ProfileSummary, ProfileVersion};
use crate::state::AppState;

#[derive(Serialize)]
pub struct DossierResponse {
    pub current: Option<ProfileVersion>,
    pub history: Vec<ProfileSummary>,
}

#[derive(Serialize)]
pub struct GenerateDossierResponse {
    pub dossier: ProfileVersion,
    pub is_refinement: bool,
}

/// GET /api/v1/dossier
pub async fn handle_get_dossier(
    State(state): State<AppState>,
) -> Result<Json<DossierResponse>, AppError> {
    let versions = state.store.list_profiles(state.config.user_id).await?;
    let history = versions.iter().map(ProfileSummary::from).collect();
    Ok(Json(DossierResponse {
        current: versions.into_iter().next(),
        history,
    }))
}

/// GET /api/v1/dossier/markdown
pub async fn handle_get_dossier_markdown(
    State(state): State<AppState>,
) -> Result<String, AppError> {
    let profile = state
        .store
        .get_latest_profile(state.config.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No dossier has been generated yet".to_string()))?;
    Ok(render_profile_to_md(&profile))
}

/// POST /api/v1/dossier
///
/// Generates and commits the next profile version from the full decision history.
pub async fn handle_generate_dossier(
    State(state): State<AppState>,
) -> Result<Json<GenerateDossierResponse>, AppError> {
    let generated = generate_and_commit_profile(
        state.store.as_ref(),
        state.synthesizer.as_ref(),
        &state.config.policy,
        state.config.user_id,
    )
    .await?;

    let is_refinement = generated.profile.kind == ProfileKind::Refinement;
    Ok(Json(GenerateDossierResponse {
        dossier: generated.profile,
        is_refinement,
    }))
}
