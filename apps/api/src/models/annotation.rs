use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicQuality {
    Strong,
    Moderate,
    Weak,
}

/// Short structured commentary on a single post ("strategic pulse").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub core_debate: String,
    pub expert_lens: String,
    pub logic_quality: LogicQuality,
    pub key_insight: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrarian_take: Option<String>,
}

/// What an annotation cache entry was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationPurpose {
    Pulse,
}

impl AnnotationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationPurpose::Pulse => "pulse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pulse" => Some(AnnotationPurpose::Pulse),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored cache row. `content` is kept untyped so one table serves every purpose.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationCacheEntry {
    pub item_id: String,
    pub purpose: AnnotationPurpose,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}
