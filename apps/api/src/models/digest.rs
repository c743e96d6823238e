use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One source item listed in a digest, with why it was included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludedItem {
    pub item_id: String,
    pub title: String,
    pub source: String,
    pub reason: String,
}

/// What the synthesizer is asked to return for a digest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DigestContent {
    pub subject: String,
    /// The provider names this field `content`.
    #[serde(alias = "content")]
    pub body_markdown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestVersion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub body_markdown: String,
    pub scheduled_for: DateTime<Utc>,
    pub included_items: Vec<IncludedItem>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Calendar day claimed by a scheduled run; `None` for on-demand digests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_day: Option<NaiveDate>,
}
