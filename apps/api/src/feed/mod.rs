//! Feed assembly: sampled subreddits plus r/all, minus anything already decided.

use std::collections::HashSet;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::feed::reddit::{ContentProvider, RedditPost};
use crate::feed::sampling::{sample_sources, shuffle_seeded, SOURCE_POOL};
use crate::models::counters::UserPreferences;
use crate::store::RecordStore;

pub mod handlers;
pub mod reddit;
pub mod sampling;

pub const SAMPLED_SOURCES: usize = 5;
pub const PER_SOURCE_LIMIT: usize = 10;
pub const FRONT_PAGE: &str = "all";
pub const FRONT_PAGE_LIMIT: usize = 25;
pub const COMMENTS_LIMIT: usize = 3;
const MIN_TITLE_CHARS: usize = 10;

#[derive(Debug, Serialize)]
pub struct Feed {
    pub sources: Vec<String>,
    pub posts: Vec<RedditPost>,
}

/// Fetches and filters a fresh feed. A failing sampled source is skipped;
/// a failing front page fails the whole request.
pub async fn assemble_feed(
    provider: &dyn ContentProvider,
    store: &dyn RecordStore,
    user_id: Uuid,
    seed: u64,
) -> Result<Feed, AppError> {
    let preferences = store
        .get_user_counters(user_id)
        .await?
        .map(|c| c.preferences)
        .unwrap_or_default();
    let seen: HashSet<String> = store.seen_item_ids(user_id).await?.into_iter().collect();

    let sources = sample_sources(
        &SOURCE_POOL,
        SAMPLED_SOURCES,
        &preferences.excluded_subreddits,
        seed,
    );
    let sampled = join_all(
        sources
            .iter()
            .map(|source| provider.list_hot(source, PER_SOURCE_LIMIT)),
    );
    let (sampled, front_page) =
        futures::join!(sampled, provider.list_hot(FRONT_PAGE, FRONT_PAGE_LIMIT));

    let mut posts = Vec::new();
    for (source, result) in sources.iter().zip(sampled) {
        match result {
            Ok(batch) => posts.extend(batch),
            Err(e) => warn!("Skipping r/{source}: {e}"),
        }
    }
    posts.extend(front_page?);

    let mut posts = filter_posts(posts, &seen, &preferences);
    shuffle_seeded(&mut posts, seed);

    info!(
        "Assembled feed of {} posts from {} sampled sources",
        posts.len(),
        sources.len()
    );
    Ok(Feed {
        sources: sources.into_iter().map(str::to_string).collect(),
        posts,
    })
}

/// Drops low-content, removed, already-seen and excluded posts, then
/// deduplicates by id keeping the first occurrence.
pub fn filter_posts(
    posts: Vec<RedditPost>,
    seen: &HashSet<String>,
    preferences: &UserPreferences,
) -> Vec<RedditPost> {
    let mut kept_ids = HashSet::new();
    posts
        .into_iter()
        .filter(|p| p.title.chars().count() > MIN_TITLE_CHARS)
        .filter(|p| !p.title.to_lowercase().contains("[removed]"))
        .filter(|p| !seen.contains(&p.id))
        .filter(|p| !preferences.excludes(&p.source))
        .filter(|p| kept_ids.insert(p.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::counters::UserCounters;
    use crate::models::event::Decision;
    use crate::store::InMemoryRecordStore;
    use crate::testing::{event_at, post, StaticContentProvider};

    #[test]
    fn test_filter_posts() {
        let posts = vec![
            post("t3_a", "space", "A perfectly reasonable title"),
            post("t3_b", "space", "Too short"),
            post("t3_c", "space", "[Removed] by moderators, sorry"),
            post("t3_d", "space", "Already decided on this one"),
            post("t3_e", "Politics", "Excluded source, long title"),
            post("t3_a", "all", "A perfectly reasonable title"),
        ];
        let seen: HashSet<String> = ["t3_d".to_string()].into();
        let preferences = UserPreferences {
            excluded_subreddits: vec!["politics".to_string()],
            ..UserPreferences::default()
        };
        let kept = filter_posts(posts, &seen, &preferences);
        let ids: Vec<_> = kept.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["t3_a"]);
    }

    #[tokio::test]
    async fn test_assemble_feed_skips_failing_sources_and_seen_items() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        store
            .append_or_update_event(&event_at(user, "t3_front_1", Decision::Like, Utc::now()))
            .await
            .unwrap();

        let provider = StaticContentProvider::new()
            .with_posts(FRONT_PAGE, vec![
                post("t3_front_1", "news", "Front page story number one"),
                post("t3_front_2", "news", "Front page story number two"),
            ])
            .with_posts_for_pool(|source| vec![post(&format!("t3_{source}"), source, "Sampled source headline")])
            .failing_source("space");

        let feed = assemble_feed(&provider, &store, user, 11).await.unwrap();
        assert_eq!(feed.sources.len(), SAMPLED_SOURCES);

        let ids: HashSet<_> = feed.posts.iter().map(|p| p.id.clone()).collect();
        assert!(ids.contains("t3_front_2"));
        assert!(!ids.contains("t3_front_1"));
        assert!(!ids.contains("t3_space"));
        let sampled_ok = feed.sources.iter().filter(|s| s.as_str() != "space").count();
        assert_eq!(feed.posts.len(), 1 + sampled_ok);
    }

    #[tokio::test]
    async fn test_front_page_failure_fails_the_feed() {
        let store = InMemoryRecordStore::new();
        let provider = StaticContentProvider::new().failing_source(FRONT_PAGE);
        let err = assemble_feed(&provider, &store, Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_excluded_sources_are_never_sampled() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let mut counters = UserCounters::empty(user, Utc::now());
        counters.preferences.excluded_subreddits =
            SOURCE_POOL[..17].iter().map(|s| s.to_string()).collect();
        store.upsert_user_counters(&counters).await.unwrap();
        let provider = StaticContentProvider::new();

        let feed = assemble_feed(&provider, &store, user, 3).await.unwrap();
        assert!(feed
            .sources
            .iter()
            .all(|s| SOURCE_POOL[17..].contains(&s.as_str())));
    }
}
