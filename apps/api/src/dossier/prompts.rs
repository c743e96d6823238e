// Profile synthesis prompt templates.

pub const PROFILE_SYSTEM: &str = "\
You build concise intelligence profiles from a reader's Reddit activity. \
You MUST respond with valid JSON only, with no markdown fences and no explanations.";

/// `{previous_section}` is empty for an initial profile.
pub const PROFILE_PROMPT_TEMPLATE: &str = r#"Create an intelligence profile from this Reddit activity.
{previous_section}
Liked ({liked_total}):
{liked_lines}

Disliked ({disliked_total}):
{disliked_lines}

Reply ONLY with JSON of exactly this shape:
{"intellectual_profile":{"primary_interests":["5 items"],"thinking_style":"brief","knowledge_depth_areas":["3 items"],"curiosity_patterns":["3 items"]},"cognitive_signature":{"analytical_tendencies":"brief","information_preferences":"brief","debate_engagement_style":"brief"},"topic_clusters":[{"name":"","strength":85,"keywords":["3"],"sample_interests":["2"]}],"evolution_notes":"only when refining","summary":"2 sentences"}"#;

pub const PREVIOUS_SECTION_TEMPLATE: &str = "\nPrevious: {previous_summary}\n";
