//! In-process scheduled digest loop.
//!
//! Each tick checks whether the user's `newsletter_time` has passed in the
//! configured day offset and, if so, runs the scheduled path. The day guard in
//! `run_scheduled_digest` makes later ticks on the same day no-ops.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::digest::generator::run_scheduled_digest;
use crate::errors::AppError;
use crate::llm_client::Synthesizer;
use crate::models::counters::UserPreferences;
use crate::models::digest::DigestVersion;
use crate::state::AppState;
use crate::store::RecordStore;

/// True once the local wall clock has reached `newsletter_time`.
/// An unreadable time never blocks delivery.
pub fn is_due(preferences: &UserPreferences, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    match NaiveTime::parse_from_str(&preferences.newsletter_time, "%H:%M") {
        Ok(at) => now.with_timezone(&offset).time() >= at,
        Err(_) => true,
    }
}

/// One scheduler tick. `Ok(None)` when it is not yet time.
pub async fn scheduler_tick(
    store: &dyn RecordStore,
    synthesizer: &dyn Synthesizer,
    policy: &PolicyConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<DigestVersion>, AppError> {
    let preferences = store
        .get_user_counters(user_id)
        .await?
        .map(|c| c.preferences)
        .unwrap_or_default();
    if !is_due(&preferences, now, policy.digest_day_offset) {
        return Ok(None);
    }
    run_scheduled_digest(store, synthesizer, policy, user_id, now)
        .await
        .map(Some)
}

pub async fn run_digest_scheduler(
    state: AppState,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!("Digest scheduler started (interval: {}s)", every.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = scheduler_tick(
                    state.store.as_ref(),
                    state.synthesizer.as_ref(),
                    &state.config.policy,
                    state.config.user_id,
                    Utc::now(),
                )
                .await;
                match result {
                    Ok(Some(digest)) => tracing::info!("Scheduled digest {} created", digest.id),
                    Ok(None) => tracing::debug!("Scheduled digest not due yet"),
                    Err(e) if e.is_informational() || matches!(e, AppError::NotFound(_)) => {
                        tracing::debug!("Scheduled digest skipped: {e}")
                    }
                    Err(e) => tracing::warn!("Scheduled digest run failed: {e}"),
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Digest scheduler shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    use crate::models::counters::UserCounters;
    use crate::models::event::Decision;
    use crate::store::InMemoryRecordStore;
    use crate::testing::{event_at, sample_profile, ScriptedSynthesizer};

    fn prefs(at: &str) -> UserPreferences {
        UserPreferences {
            newsletter_time: at.to_string(),
            ..UserPreferences::default()
        }
    }

    #[test]
    fn test_is_due_compares_local_time() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 7, 59, 0).unwrap();
        assert!(!is_due(&prefs("08:00"), now, utc));
        assert!(is_due(&prefs("08:00"), now + ChronoDuration::minutes(1), utc));

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert!(is_due(&prefs("08:00"), now, plus_two));
    }

    #[test]
    fn test_unreadable_time_is_always_due() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert!(is_due(&prefs("morning"), Utc::now(), utc));
    }

    #[tokio::test]
    async fn test_tick_before_newsletter_time_does_nothing() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
        store.upsert_user_counters(&UserCounters::empty(user, now)).await.unwrap();
        let synth = ScriptedSynthesizer::new(Vec::<String>::new());

        let out = scheduler_tick(&store, &synth, &PolicyConfig::default(), user, now)
            .await
            .unwrap();
        assert!(out.is_none());
        assert_eq!(synth.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_ticks_produce_one_digest() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        store.insert_profile(sample_profile(user, 500)).await.unwrap();
        for i in 0..4 {
            let e = event_at(user, &format!("t3_{i}"), Decision::Like, now - ChronoDuration::hours(i));
            store.append_or_update_event(&e).await.unwrap();
        }
        let synth = ScriptedSynthesizer::new([r#"{"subject": "s", "content": "c"}"#]);
        let policy = PolicyConfig::default();

        let first = scheduler_tick(&store, &synth, &policy, user, now).await.unwrap();
        let second =
            scheduler_tick(&store, &synth, &policy, user, now + ChronoDuration::minutes(5)).await;

        assert!(first.is_some());
        assert!(matches!(second, Err(AppError::AlreadySatisfied(_))));
        assert_eq!(store.list_digests(user).await.unwrap().len(), 1);
    }
}
