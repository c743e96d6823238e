pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::annotation::handlers as annotation;
use crate::digest::handlers as digest;
use crate::dossier::handlers as dossier;
use crate::feed::handlers as feed;
use crate::state::AppState;
use crate::swipes::handlers as swipes;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Preference events
        .route(
            "/api/v1/swipes",
            get(swipes::handle_swipe_state).post(swipes::handle_record_swipe),
        )
        .route(
            "/api/v1/preferences",
            patch(swipes::handle_update_preferences),
        )
        // Content
        .route("/api/v1/feed", get(feed::handle_get_feed))
        .route("/api/v1/feed/comments", get(feed::handle_get_comments))
        .route(
            "/api/v1/annotations/pulse",
            post(annotation::handle_pulse),
        )
        // Profile
        .route(
            "/api/v1/dossier",
            get(dossier::handle_get_dossier).post(dossier::handle_generate_dossier),
        )
        .route(
            "/api/v1/dossier/markdown",
            get(dossier::handle_get_dossier_markdown),
        )
        // Digest
        .route(
            "/api/v1/digests",
            get(digest::handle_list_digests).post(digest::handle_generate_digest),
        )
        .route(
            "/api/v1/digests/scheduled",
            get(digest::handle_scheduled_digest),
        )
        .with_state(state)
}
