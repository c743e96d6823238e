use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Initial,
    Refinement,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Initial => "initial",
            ProfileKind::Refinement => "refinement",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(ProfileKind::Initial),
            "refinement" => Some(ProfileKind::Refinement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntellectualProfile {
    pub primary_interests: Vec<String>,
    pub thinking_style: String,
    #[serde(default)]
    pub knowledge_depth_areas: Vec<String>,
    #[serde(default)]
    pub curiosity_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveSignature {
    pub analytical_tendencies: String,
    pub information_preferences: String,
    pub debate_engagement_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCluster {
    pub name: String,
    /// 0 – 100
    pub strength: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sample_interests: Vec<String>,
}

/// The synthesized "DNA dossier" document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileContent {
    pub intellectual_profile: IntellectualProfile,
    pub cognitive_signature: CognitiveSignature,
    #[serde(default)]
    pub topic_clusters: Vec<TopicCluster>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution_notes: Option<String>,
    pub summary: String,
}

impl ProfileContent {
    /// Checks fields serde cannot express and clamps cluster strengths into 0–100.
    pub fn validated(mut self) -> Result<Self, String> {
        if self.summary.trim().is_empty() {
            return Err("profile summary is empty".to_string());
        }
        if self.intellectual_profile.primary_interests.is_empty() {
            return Err("profile lists no primary interests".to_string());
        }
        for cluster in &mut self.topic_clusters {
            cluster.strength = if cluster.strength.is_finite() {
                cluster.strength.clamp(0.0, 100.0)
            } else {
                0.0
            };
        }
        Ok(self)
    }
}

/// An immutable, versioned profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileVersion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub version: i32,
    pub event_count_at_generation: i64,
    pub kind: ProfileKind,
    pub content: ProfileContent,
    pub created_at: DateTime<Utc>,
}

/// History listing entry (content omitted).
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub version: i32,
    pub kind: ProfileKind,
    pub event_count_at_generation: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&ProfileVersion> for ProfileSummary {
    fn from(p: &ProfileVersion) -> Self {
        Self {
            id: p.id,
            version: p.version,
            kind: p.kind,
            event_count_at_generation: p.event_count_at_generation,
            created_at: p.created_at,
        }
    }
}

/// A profile ready to be inserted; the store assigns `version`.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub event_count_at_generation: i64,
    pub kind: ProfileKind,
    pub content: ProfileContent,
}
