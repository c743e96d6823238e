use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::Decision;

/// Per-user running totals. Created lazily on the first recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCounters {
    pub user_id: Uuid,
    pub total_events: i64,
    pub like_count: i64,
    pub dislike_count: i64,
    /// `total_events` captured when the latest profile was generated. 0 = never.
    pub last_profile_event_count: i64,
    pub preferences: UserPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserCounters {
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_events: 0,
            like_count: 0,
            dislike_count: 0,
            last_profile_event_count: 0,
            preferences: UserPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a recorded decision. `previous` is the decision the item carried
    /// before this upsert, if the item had already been decided.
    ///
    /// - new item: total and the matching bucket grow by one
    /// - same decision again: no change
    /// - switched decision: one count moves between buckets, total unchanged
    pub fn apply_decision(&mut self, previous: Option<Decision>, decision: Decision) {
        match previous {
            None => {
                self.total_events += 1;
                *self.bucket_mut(decision) += 1;
            }
            Some(prev) if prev == decision => {}
            Some(prev) => {
                let old = self.bucket_mut(prev);
                *old = (*old - 1).max(0);
                *self.bucket_mut(decision) += 1;
            }
        }
    }

    /// Resets the totals to what the event log holds. Returns whether anything changed.
    pub fn reconcile(&mut self, like_count: i64, dislike_count: i64) -> bool {
        let before = (self.total_events, self.like_count, self.dislike_count);
        self.like_count = like_count;
        self.dislike_count = dislike_count;
        self.total_events = like_count + dislike_count;
        before != (self.total_events, self.like_count, self.dislike_count)
    }

    fn bucket_mut(&mut self, decision: Decision) -> &mut i64 {
        match decision {
            Decision::Like => &mut self.like_count,
            Decision::Dislike => &mut self.dislike_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default = "default_true")]
    pub newsletter_enabled: bool,
    /// Local "HH:MM" after which the scheduler may produce the day's digest.
    #[serde(default = "default_newsletter_time")]
    pub newsletter_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub excluded_subreddits: Vec<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            newsletter_enabled: true,
            newsletter_time: default_newsletter_time(),
            timezone: default_timezone(),
            excluded_subreddits: Vec::new(),
        }
    }
}

/// Partial preferences update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesPatch {
    pub newsletter_enabled: Option<bool>,
    pub newsletter_time: Option<String>,
    pub timezone: Option<String>,
    pub excluded_subreddits: Option<Vec<String>>,
}

impl UserPreferences {
    pub fn merge(&mut self, patch: PreferencesPatch) {
        if let Some(enabled) = patch.newsletter_enabled {
            self.newsletter_enabled = enabled;
        }
        if let Some(time) = patch.newsletter_time {
            self.newsletter_time = time;
        }
        if let Some(tz) = patch.timezone {
            self.timezone = tz;
        }
        if let Some(excluded) = patch.excluded_subreddits {
            self.excluded_subreddits = excluded;
        }
    }

    pub fn excludes(&self, subreddit: &str) -> bool {
        self.excluded_subreddits
            .iter()
            .any(|s| s.eq_ignore_ascii_case(subreddit))
    }
}

fn default_true() -> bool {
    true
}

fn default_newsletter_time() -> String {
    "08:00".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters() -> UserCounters {
        UserCounters::empty(Uuid::nil(), Utc::now())
    }

    #[test]
    fn test_first_decision_counts() {
        let mut c = counters();
        c.apply_decision(None, Decision::Like);
        c.apply_decision(None, Decision::Dislike);
        c.apply_decision(None, Decision::Like);
        assert_eq!(c.total_events, 3);
        assert_eq!(c.like_count, 2);
        assert_eq!(c.dislike_count, 1);
    }

    #[test]
    fn test_switching_decision_keeps_total() {
        let mut c = counters();
        c.apply_decision(None, Decision::Like);
        c.apply_decision(Some(Decision::Like), Decision::Dislike);
        assert_eq!(c.total_events, 1);
        assert_eq!(c.like_count, 0);
        assert_eq!(c.dislike_count, 1);
    }

    #[test]
    fn test_reconcile_reports_drift() {
        let mut c = counters();
        c.apply_decision(None, Decision::Like);
        assert!(!c.reconcile(1, 0));
        assert!(c.reconcile(2, 1));
        assert_eq!(c.total_events, 3);
        assert_eq!(c.like_count, 2);
        assert_eq!(c.dislike_count, 1);
    }

    #[test]
    fn test_repeated_decision_is_noop() {
        let mut c = counters();
        c.apply_decision(None, Decision::Dislike);
        let before = c.clone();
        c.apply_decision(Some(Decision::Dislike), Decision::Dislike);
        assert_eq!(c, before);
    }

    #[test]
    fn test_preferences_merge_keeps_absent_fields() {
        let mut prefs = UserPreferences::default();
        prefs.merge(PreferencesPatch {
            newsletter_enabled: Some(false),
            excluded_subreddits: Some(vec!["Politics".to_string()]),
            ..Default::default()
        });
        assert!(!prefs.newsletter_enabled);
        assert_eq!(prefs.newsletter_time, "08:00");
        assert!(prefs.excludes("politics"));
    }

    #[test]
    fn test_preferences_tolerate_missing_keys() {
        let prefs: UserPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, UserPreferences::default());
    }
}
