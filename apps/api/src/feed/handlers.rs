use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::feed::reddit::RedditComment;
use crate::feed::{assemble_feed, Feed, COMMENTS_LIMIT};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Fixes sampling and ordering; random when omitted.
    pub seed: Option<u64>,
}

/// GET /api/v1/feed
pub async fn handle_get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Feed>, AppError> {
    let seed = query.seed.unwrap_or_else(rand::random);
    let feed = assemble_feed(
        state.content.as_ref(),
        state.store.as_ref(),
        state.config.user_id,
        seed,
    )
    .await?;
    Ok(Json(feed))
}

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    pub permalink: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<RedditComment>,
}

/// GET /api/v1/feed/comments?permalink=/r/…
pub async fn handle_get_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<CommentsResponse>, AppError> {
    validate_permalink(&query.permalink)?;
    let limit = query.limit.unwrap_or(COMMENTS_LIMIT).clamp(1, 25);
    let comments = state
        .content
        .list_comments(&query.permalink, limit)
        .await?;
    Ok(Json(CommentsResponse { comments }))
}

/// Permalinks are site-relative (`/r/<sub>/comments/...`).
pub fn validate_permalink(permalink: &str) -> Result<(), AppError> {
    if !permalink.starts_with("/r/") || permalink.contains("..") || permalink.contains("://") {
        return Err(AppError::Validation(format!(
            "permalink must be a relative /r/ path, got '{permalink}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_permalink() {
        assert!(validate_permalink("/r/space/comments/abc/why/").is_ok());
        assert!(validate_permalink("").is_err());
        assert!(validate_permalink("https://evil.example/r/x").is_err());
        assert!(validate_permalink("/r/../../admin").is_err());
    }
}
