//! Preference Event Log: records one decision per item and keeps counters in step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::dossier::trigger::should_generate_profile;
use crate::errors::AppError;
use crate::models::annotation::Annotation;
use crate::models::counters::{PreferencesPatch, UserCounters, UserPreferences};
use crate::models::event::{Decision, EventFilter, ItemMetadata, PreferenceEvent};
use crate::store::RecordStore;

#[derive(Debug, Clone, Deserialize)]
pub struct RecordDecisionRequest {
    pub item_id: String,
    pub decision: Decision,
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub annotation: Option<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterSnapshot {
    pub total_events: i64,
    pub like_count: i64,
    pub dislike_count: i64,
}

impl From<&UserCounters> for CounterSnapshot {
    fn from(c: &UserCounters) -> Self {
        Self {
            total_events: c.total_events,
            like_count: c.like_count,
            dislike_count: c.dislike_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordDecisionResponse {
    pub counters: CounterSnapshot,
    /// The caller may now request a new profile.
    pub trigger_profile: bool,
}

/// Upserts the event, then recomputes counters from the decision it replaced.
///
/// The event write completes before the counters are read, so the counter
/// delta always matches what the log now holds.
pub async fn record_decision(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    user_id: Uuid,
    request: RecordDecisionRequest,
    now: DateTime<Utc>,
) -> Result<RecordDecisionResponse, AppError> {
    if request.item_id.trim().is_empty() {
        return Err(AppError::Validation("item_id cannot be empty".to_string()));
    }

    let event = PreferenceEvent {
        id: Uuid::new_v4(),
        user_id,
        item_id: request.item_id,
        decision: request.decision,
        item: ItemMetadata {
            source: request.source,
            title: request.title,
            score: request.score,
            url: request.url,
        },
        annotation: request.annotation,
        created_at: now,
    };

    let previous = store.append_or_update_event(&event).await?;

    let mut counters = store
        .get_user_counters(user_id)
        .await?
        .unwrap_or_else(|| UserCounters::empty(user_id, now));
    if previous == Some(event.decision) {
        // A retry of a decision whose counter write failed. The log is authoritative.
        let likes = store.list_events(user_id, &EventFilter::likes()).await?.len();
        let dislikes = store.list_events(user_id, &EventFilter::dislikes()).await?.len();
        if counters.reconcile(likes as i64, dislikes as i64) {
            warn!(
                "Counters for user {} drifted from the event log; rebuilt to {}",
                user_id, counters.total_events
            );
            store.upsert_user_counters(&counters).await?;
        }
    } else {
        counters.apply_decision(previous, event.decision);
        store.upsert_user_counters(&counters).await?;
    }

    debug!(
        "Recorded {} on {} (previous: {:?}); total={}",
        event.decision, event.item_id, previous, counters.total_events
    );

    Ok(RecordDecisionResponse {
        trigger_profile: should_generate_profile(
            counters.total_events,
            counters.last_profile_event_count,
            policy,
        ),
        counters: CounterSnapshot::from(&counters),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SwipeState {
    pub counters: CounterSnapshot,
    pub preferences: UserPreferences,
    pub seen_ids: Vec<String>,
}

/// Counters (zeros when none exist yet), preferences and every seen item id.
pub async fn load_swipe_state(
    store: &dyn RecordStore,
    user_id: Uuid,
) -> Result<SwipeState, AppError> {
    let counters = store
        .get_user_counters(user_id)
        .await?
        .unwrap_or_else(|| UserCounters::empty(user_id, Utc::now()));
    let seen_ids = store.seen_item_ids(user_id).await?;
    Ok(SwipeState {
        counters: CounterSnapshot::from(&counters),
        preferences: counters.preferences,
        seen_ids,
    })
}

/// Merges a partial preferences update into the counters record.
pub async fn update_preferences(
    store: &dyn RecordStore,
    user_id: Uuid,
    patch: PreferencesPatch,
) -> Result<UserPreferences, AppError> {
    if let Some(time) = &patch.newsletter_time {
        if chrono::NaiveTime::parse_from_str(time, "%H:%M").is_err() {
            return Err(AppError::Validation(format!(
                "newsletter_time must be HH:MM, got '{time}'"
            )));
        }
    }
    let mut counters = store
        .get_user_counters(user_id)
        .await?
        .unwrap_or_else(|| UserCounters::empty(user_id, Utc::now()));
    counters.preferences.merge(patch);
    store.upsert_user_counters(&counters).await?;
    Ok(counters.preferences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use crate::testing::{decision_request, FailingCountersStore};

    #[tokio::test]
    async fn test_first_decision_creates_counters() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let response = record_decision(
            &store,
            &PolicyConfig::default(),
            user,
            decision_request("t3_a", Decision::Like),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(response.counters.total_events, 1);
        assert_eq!(response.counters.like_count, 1);
        assert!(!response.trigger_profile);
    }

    #[tokio::test]
    async fn test_switching_decision_overwrites_single_row() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let policy = PolicyConfig::default();

        record_decision(&store, &policy, user, decision_request("t3_a", Decision::Like), Utc::now())
            .await
            .unwrap();
        let response = record_decision(
            &store,
            &policy,
            user,
            decision_request("t3_a", Decision::Dislike),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(response.counters.total_events, 1);
        assert_eq!(response.counters.like_count, 0);
        assert_eq!(response.counters.dislike_count, 1);

        let events = store.list_events(user, &EventFilter::default()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decision, Decision::Dislike);
    }

    #[tokio::test]
    async fn test_retry_after_counter_failure_rebuilds_counters() {
        let store = FailingCountersStore::new(InMemoryRecordStore::new());
        let user = Uuid::new_v4();
        let policy = PolicyConfig::default();

        record_decision(&store, &policy, user, decision_request("t3_a", Decision::Like), Utc::now())
            .await
            .unwrap();
        store.fail_counter_writes();
        let err = record_decision(&store, &policy, user, decision_request("t3_b", Decision::Dislike), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));

        let stale = store.inner().get_user_counters(user).await.unwrap().unwrap();
        assert_eq!(stale.total_events, 1, "event row landed, counters did not");

        store.restore_counter_writes();
        let response = record_decision(&store, &policy, user, decision_request("t3_b", Decision::Dislike), Utc::now())
            .await
            .unwrap();
        assert_eq!(response.counters.total_events, 2);
        assert_eq!(response.counters.like_count, 1);
        assert_eq!(response.counters.dislike_count, 1);
    }

    #[tokio::test]
    async fn test_repeated_decision_leaves_counters() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let policy = PolicyConfig::default();

        for _ in 0..3 {
            record_decision(&store, &policy, user, decision_request("t3_a", Decision::Like), Utc::now())
                .await
                .unwrap();
        }
        let counters = store.get_user_counters(user).await.unwrap().unwrap();
        assert_eq!(counters.total_events, 1);
        assert_eq!(counters.like_count, 1);
    }

    #[tokio::test]
    async fn test_trigger_reported_at_threshold() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let policy = PolicyConfig {
            initial_threshold: 3,
            ..PolicyConfig::default()
        };
        let mut triggers = Vec::new();
        for i in 0..3 {
            let r = record_decision(
                &store,
                &policy,
                user,
                decision_request(&format!("t3_{i}"), Decision::Like),
                Utc::now(),
            )
            .await
            .unwrap();
            triggers.push(r.trigger_profile);
        }
        assert_eq!(triggers, vec![false, false, true]);
    }

    #[tokio::test]
    async fn test_blank_item_id_rejected() {
        let store = InMemoryRecordStore::new();
        let err = record_decision(
            &store,
            &PolicyConfig::default(),
            Uuid::new_v4(),
            decision_request("  ", Decision::Like),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_swipe_state_defaults_to_zero() {
        let store = InMemoryRecordStore::new();
        let state = load_swipe_state(&store, Uuid::new_v4()).await.unwrap();
        assert_eq!(state.counters.total_events, 0);
        assert!(state.seen_ids.is_empty());
        assert!(state.preferences.newsletter_enabled);
    }

    #[tokio::test]
    async fn test_update_preferences_validates_time() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let err = update_preferences(
            &store,
            user,
            PreferencesPatch {
                newsletter_time: Some("8am".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let prefs = update_preferences(
            &store,
            user,
            PreferencesPatch {
                newsletter_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!prefs.newsletter_enabled);
        let counters = store.get_user_counters(user).await.unwrap().unwrap();
        assert_eq!(counters.total_events, 0);
        assert!(!counters.preferences.newsletter_enabled);
    }
}
