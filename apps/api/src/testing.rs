//! Fixtures and scripted collaborators shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{Config, PolicyConfig};
use crate::errors::AppError;
use crate::feed::reddit::{ContentProvider, ProviderError, RedditComment, RedditPost};
use crate::feed::sampling::SOURCE_POOL;
use crate::llm_client::{LlmError, Synthesizer};
use crate::models::annotation::{AnnotationCacheEntry, AnnotationPurpose};
use crate::models::counters::UserCounters;
use crate::models::digest::DigestVersion;
use crate::models::event::{Decision, EventFilter, ItemMetadata, PreferenceEvent};
use crate::models::profile::{NewProfile, ProfileContent, ProfileKind, ProfileVersion};
use crate::store::{InMemoryRecordStore, RecordStore};
use crate::swipes::recorder::{record_decision, RecordDecisionRequest};

pub fn event_at(
    user_id: Uuid,
    item_id: &str,
    decision: Decision,
    created_at: DateTime<Utc>,
) -> PreferenceEvent {
    PreferenceEvent {
        id: Uuid::new_v4(),
        user_id,
        item_id: item_id.to_string(),
        decision,
        item: ItemMetadata {
            source: "space".to_string(),
            title: format!("Title for {item_id}"),
            score: 42,
            url: format!("https://example.com/{item_id}"),
        },
        annotation: None,
        created_at,
    }
}

pub fn decision_request(item_id: &str, decision: Decision) -> RecordDecisionRequest {
    RecordDecisionRequest {
        item_id: item_id.to_string(),
        decision,
        source: "space".to_string(),
        title: format!("Title for {item_id}"),
        score: 42,
        url: format!("https://example.com/{item_id}"),
        annotation: None,
    }
}

/// Records `n` decisions on fresh items, alternating like and dislike,
/// one second apart.
pub async fn record_decisions(store: &dyn RecordStore, user_id: Uuid, n: usize) {
    let base = Utc::now();
    let policy = PolicyConfig::default();
    for i in 0..n {
        let decision = if i % 2 == 0 { Decision::Like } else { Decision::Dislike };
        record_decision(
            store,
            &policy,
            user_id,
            decision_request(&format!("t3_{}", Uuid::new_v4().simple()), decision),
            base + chrono::Duration::seconds(i as i64),
        )
        .await
        .expect("recording a fixture decision");
    }
}

pub fn sample_profile_json() -> String {
    r#"{
        "intellectual_profile": {
            "primary_interests": ["space exploration", "economics"],
            "thinking_style": "systems thinker",
            "knowledge_depth_areas": ["orbital mechanics"],
            "curiosity_patterns": ["how incentives shape engineering"]
        },
        "cognitive_signature": {
            "analytical_tendencies": "first principles",
            "information_preferences": "long-form explainers",
            "debate_engagement_style": "steelmans the other side"
        },
        "topic_clusters": [
            {"name": "Spaceflight", "strength": 85, "keywords": ["launch", "reuse"], "sample_interests": ["Starship"]}
        ],
        "evolution_notes": "Economics interest has grown.",
        "summary": "Drawn to where engineering meets economics."
    }"#
    .to_string()
}

pub fn sample_content() -> ProfileContent {
    serde_json::from_str(&sample_profile_json()).expect("sample profile parses")
}

pub fn sample_profile(user_id: Uuid, event_count: i64) -> NewProfile {
    NewProfile {
        user_id,
        event_count_at_generation: event_count,
        kind: ProfileKind::Initial,
        content: sample_content(),
    }
}

pub fn post(id: &str, source: &str, title: &str) -> RedditPost {
    RedditPost {
        id: id.to_string(),
        title: title.to_string(),
        body: None,
        source: source.to_string(),
        author: "tester".to_string(),
        score: 100,
        num_comments: 10,
        url: format!("https://example.com/{id}"),
        permalink: format!("/r/{source}/comments/{id}/"),
        created_utc: 1_700_000_000.0,
        thumbnail: None,
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        anthropic_api_key: "test-key".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        user_id: Uuid::new_v4(),
        cron_secret: None,
        reddit_base_url: "http://localhost".to_string(),
        reddit_user_agent: "dna-api-tests".to_string(),
        synthesis_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(10),
        digest_scheduler_interval: Duration::ZERO,
        policy: PolicyConfig::default(),
    }
}

/// Replays canned answers in order and records every prompt it was given.
/// Running out of answers is an `EmptyContent` failure.
pub struct ScriptedSynthesizer {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedSynthesizer {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Sleeps before answering, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::EmptyContent)
    }
}

/// Serves fixed listings. Sources without posts return an empty listing.
#[derive(Default)]
pub struct StaticContentProvider {
    posts: HashMap<String, Vec<RedditPost>>,
    failing: HashSet<String>,
    comments: Vec<String>,
    comments_fail: bool,
}

impl StaticContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(mut self, source: &str, posts: Vec<RedditPost>) -> Self {
        self.posts.insert(source.to_string(), posts);
        self
    }

    pub fn with_posts_for_pool(mut self, make: impl Fn(&str) -> Vec<RedditPost>) -> Self {
        for source in SOURCE_POOL {
            self.posts.insert(source.to_string(), make(source));
        }
        self
    }

    pub fn failing_source(mut self, source: &str) -> Self {
        self.failing.insert(source.to_string());
        self
    }

    pub fn with_comments<I, S>(mut self, bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comments = bodies.into_iter().map(Into::into).collect();
        self
    }

    pub fn failing_comments(mut self) -> Self {
        self.comments_fail = true;
        self
    }
}

#[async_trait]
impl ContentProvider for StaticContentProvider {
    async fn list_hot(&self, source: &str, limit: usize) -> Result<Vec<RedditPost>, ProviderError> {
        if self.failing.contains(source) {
            return Err(ProviderError::Status {
                status: 503,
                url: format!("/r/{source}/hot.json"),
            });
        }
        let mut posts = self.posts.get(source).cloned().unwrap_or_default();
        posts.truncate(limit);
        Ok(posts)
    }

    async fn list_comments(
        &self,
        permalink: &str,
        limit: usize,
    ) -> Result<Vec<RedditComment>, ProviderError> {
        if self.comments_fail {
            return Err(ProviderError::Status {
                status: 503,
                url: format!("{permalink}.json"),
            });
        }
        Ok(self
            .comments
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, body)| RedditComment {
                id: format!("c{i}"),
                body: body.clone(),
                author: "commenter".to_string(),
                score: 1,
                created_utc: 1_700_000_000.0,
            })
            .collect())
    }
}

/// Delegates to an in-memory store; counter writes can be switched to fail.
pub struct FailingCountersStore {
    inner: InMemoryRecordStore,
    fail_counters: AtomicBool,
}

impl FailingCountersStore {
    pub fn new(inner: InMemoryRecordStore) -> Self {
        Self {
            inner,
            fail_counters: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &InMemoryRecordStore {
        &self.inner
    }

    pub fn fail_counter_writes(&self) {
        self.fail_counters.store(true, Ordering::SeqCst);
    }

    pub fn restore_counter_writes(&self) {
        self.fail_counters.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FailingCountersStore {
    async fn get_user_counters(&self, user_id: Uuid) -> Result<Option<UserCounters>, AppError> {
        self.inner.get_user_counters(user_id).await
    }

    async fn upsert_user_counters(&self, counters: &UserCounters) -> Result<(), AppError> {
        if self.fail_counters.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(sqlx::Error::PoolTimedOut));
        }
        self.inner.upsert_user_counters(counters).await
    }

    async fn append_or_update_event(
        &self,
        event: &PreferenceEvent,
    ) -> Result<Option<Decision>, AppError> {
        self.inner.append_or_update_event(event).await
    }

    async fn list_events(
        &self,
        user_id: Uuid,
        filter: &EventFilter,
    ) -> Result<Vec<PreferenceEvent>, AppError> {
        self.inner.list_events(user_id, filter).await
    }

    async fn seen_item_ids(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        self.inner.seen_item_ids(user_id).await
    }

    async fn get_latest_profile(&self, user_id: Uuid) -> Result<Option<ProfileVersion>, AppError> {
        self.inner.get_latest_profile(user_id).await
    }

    async fn list_profiles(&self, user_id: Uuid) -> Result<Vec<ProfileVersion>, AppError> {
        self.inner.list_profiles(user_id).await
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileVersion, AppError> {
        self.inner.insert_profile(profile).await
    }

    async fn get_latest_digest(&self, user_id: Uuid) -> Result<Option<DigestVersion>, AppError> {
        self.inner.get_latest_digest(user_id).await
    }

    async fn list_digests(&self, user_id: Uuid) -> Result<Vec<DigestVersion>, AppError> {
        self.inner.list_digests(user_id).await
    }

    async fn insert_digest(&self, digest: &DigestVersion) -> Result<(), AppError> {
        self.inner.insert_digest(digest).await
    }

    async fn get_annotation(
        &self,
        item_id: &str,
        purpose: AnnotationPurpose,
    ) -> Result<Option<AnnotationCacheEntry>, AppError> {
        self.inner.get_annotation(item_id, purpose).await
    }

    async fn upsert_annotation(&self, entry: &AnnotationCacheEntry) -> Result<(), AppError> {
        self.inner.upsert_annotation(entry).await
    }
}
