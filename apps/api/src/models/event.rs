use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::annotation::Annotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Like,
    Dislike,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Like => "like",
            Decision::Dislike => "dislike",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Decision::Like),
            "dislike" => Ok(Decision::Dislike),
            other => Err(format!("unknown decision '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Subreddit name, without the `r/` prefix.
    pub source: String,
    pub title: String,
    pub score: i64,
    pub url: String,
}

/// One like/dislike decision. Unique per (user_id, item_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: String,
    pub decision: Decision,
    pub item: ItemMetadata,
    pub annotation: Option<Annotation>,
    pub created_at: DateTime<Utc>,
}

impl PreferenceEvent {
    pub fn is_like(&self) -> bool {
        self.decision == Decision::Like
    }
}

/// Narrowing applied by `RecordStore::list_events`. Results stay newest first.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub decision: Option<Decision>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn likes() -> Self {
        Self {
            decision: Some(Decision::Like),
            ..Default::default()
        }
    }

    pub fn dislikes() -> Self {
        Self {
            decision: Some(Decision::Dislike),
            ..Default::default()
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, event: &PreferenceEvent) -> bool {
        self.decision.map_or(true, |d| event.decision == d)
            && self.since.map_or(true, |s| event.created_at >= s)
    }
}
