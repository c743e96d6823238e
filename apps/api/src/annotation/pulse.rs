//! Strategic pulse: a one-line-per-field commentary on a single post.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::annotation::prompts::{PULSE_PROMPT_TEMPLATE, PULSE_SYSTEM};
use crate::errors::AppError;
use crate::feed::reddit::ContentProvider;
use crate::llm_client::prompts::truncate;
use crate::llm_client::{extract_json_block, LlmError, Synthesizer};
use crate::models::annotation::{Annotation, LogicQuality};

const TITLE_CHARS: usize = 150;
const BODY_CHARS: usize = 200;
const COMMENT_CHARS: usize = 100;
pub const PULSE_COMMENTS: usize = 2;
pub const UNAVAILABLE: &str = "Analysis unavailable";

/// The post being annotated, as the client saw it.
#[derive(Debug, Clone, Deserialize)]
pub struct PulseRequest {
    pub item_id: String,
    pub title: String,
    pub source: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

impl PulseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.item_id.trim().is_empty() {
            return Err(AppError::Validation("item_id cannot be empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        Ok(())
    }
}

pub fn build_pulse_prompt(request: &PulseRequest, comments: &[String]) -> String {
    let comments = if comments.is_empty() {
        "None".to_string()
    } else {
        comments
            .iter()
            .take(PULSE_COMMENTS)
            .map(|c| truncate(c, COMMENT_CHARS))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    PULSE_PROMPT_TEMPLATE
        .replace("{title}", &truncate(&request.title, TITLE_CHARS))
        .replace("{source}", &request.source)
        .replace(
            "{body}",
            &truncate(request.body.as_deref().unwrap_or_default(), BODY_CHARS),
        )
        .replace("{comments}", &comments)
}

/// Lenient parse: absent or blank text fields read "Analysis unavailable" and an
/// unrecognised `logic_quality` reads as moderate. Only a missing JSON object fails.
pub fn parse_pulse(raw: &str) -> Result<Annotation, AppError> {
    let block = extract_json_block(raw)
        .ok_or_else(|| AppError::from_llm("pulse annotation", LlmError::NoStructuredBlock))?;
    let value: Value = serde_json::from_str(block)
        .map_err(|e| AppError::from_llm("pulse annotation", LlmError::Parse(e)))?;

    let text = |key: &str| -> Option<String> {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let logic_quality = match text("logic_quality").map(|s| s.to_lowercase()).as_deref() {
        Some("strong") => LogicQuality::Strong,
        Some("weak") => LogicQuality::Weak,
        _ => LogicQuality::Moderate,
    };

    Ok(Annotation {
        core_debate: text("core_debate").unwrap_or_else(|| UNAVAILABLE.to_string()),
        expert_lens: text("expert_lens").unwrap_or_else(|| UNAVAILABLE.to_string()),
        logic_quality,
        key_insight: text("key_insight").unwrap_or_else(|| UNAVAILABLE.to_string()),
        contrarian_take: text("contrarian_take"),
    })
}

/// Fetches a couple of comments for context, then asks the synthesizer.
/// Comment fetch failures only remove the context.
pub async fn produce_pulse(
    synthesizer: &dyn Synthesizer,
    content: &dyn ContentProvider,
    request: &PulseRequest,
) -> Result<Annotation, AppError> {
    let comments = match request.permalink.as_deref() {
        Some(permalink) => match content.list_comments(permalink, PULSE_COMMENTS).await {
            Ok(comments) => comments.into_iter().map(|c| c.body).collect(),
            Err(e) => {
                warn!("Pulse for {} continues without comments: {e}", request.item_id);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let prompt = build_pulse_prompt(request, &comments);
    let raw = synthesizer
        .synthesize(&prompt, PULSE_SYSTEM)
        .await
        .map_err(|e| AppError::from_llm("pulse annotation", e))?;
    parse_pulse(&raw)
}
