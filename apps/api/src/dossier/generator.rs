//! Profile Generator: bounded history window in, validated `ProfileContent` out.
//!
//! Flow: capture count → load events → precondition → build prompt →
//!       synthesize → validate → commit version → update last-generation mark.

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::dossier::prompts::{PREVIOUS_SECTION_TEMPLATE, PROFILE_PROMPT_TEMPLATE, PROFILE_SYSTEM};
use crate::dossier::versioning::commit_profile;
use crate::errors::AppError;
use crate::llm_client::prompts::truncate;
use crate::llm_client::{synthesize_json, Synthesizer};
use crate::models::event::{EventFilter, PreferenceEvent};
use crate::models::profile::{ProfileContent, ProfileKind, ProfileVersion};
use crate::store::RecordStore;

const PROFILE_TITLE_CHARS: usize = 60;
const PREVIOUS_SUMMARY_CHARS: usize = 150;

/// The liked/disliked lists handed to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow<'a> {
    pub liked_total: usize,
    pub disliked_total: usize,
    /// Most recent first, at most `window` entries.
    pub liked: Vec<&'a PreferenceEvent>,
    pub disliked: Vec<&'a PreferenceEvent>,
}

/// Partitions newest-first events by decision and keeps the `window` most recent of each.
pub fn build_history_window(events: &[PreferenceEvent], window: usize) -> HistoryWindow<'_> {
    let (liked, disliked): (Vec<_>, Vec<_>) = events.iter().partition(|e| e.is_like());
    HistoryWindow {
        liked_total: liked.len(),
        disliked_total: disliked.len(),
        liked: liked.into_iter().take(window).collect(),
        disliked: disliked.into_iter().take(window).collect(),
    }
}

fn format_lines(events: &[&PreferenceEvent]) -> String {
    events
        .iter()
        .map(|e| format!("r/{}: {}", e.item.source, truncate(&e.item.title, PROFILE_TITLE_CHARS)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fills the profile template. The previous summary is included only for a refinement.
pub fn build_profile_prompt(window: &HistoryWindow<'_>, previous: Option<&ProfileContent>) -> String {
    let previous_section = previous
        .map(|p| {
            PREVIOUS_SECTION_TEMPLATE.replace(
                "{previous_summary}",
                &truncate(&p.summary, PREVIOUS_SUMMARY_CHARS),
            )
        })
        .unwrap_or_default();

    PROFILE_PROMPT_TEMPLATE
        .replace("{previous_section}", &previous_section)
        .replace("{liked_total}", &window.liked_total.to_string())
        .replace("{liked_lines}", &format_lines(&window.liked))
        .replace("{disliked_total}", &window.disliked_total.to_string())
        .replace("{disliked_lines}", &format_lines(&window.disliked))
}

/// Synthesizes a profile from newest-first `events`.
///
/// Does not enforce the minimum-events precondition; `generate_and_commit_profile` does.
pub async fn generate_profile(
    synthesizer: &dyn Synthesizer,
    events: &[PreferenceEvent],
    previous: Option<&ProfileContent>,
    policy: &PolicyConfig,
) -> Result<ProfileContent, AppError> {
    let window = build_history_window(events, policy.profile_window);
    let prompt = build_profile_prompt(&window, previous);

    let content: ProfileContent = synthesize_json(synthesizer, &prompt, PROFILE_SYSTEM)
        .await
        .map_err(|e| AppError::from_llm("profile generation", e))?;

    content
        .validated()
        .map_err(|msg| AppError::MalformedResponse(format!("profile generation: {msg}")))
}

/// Outcome of a full generation run.
#[derive(Debug, Clone)]
pub struct GeneratedProfile {
    pub profile: ProfileVersion,
    /// False when the counters' last-generation mark could not be written.
    pub mark_updated: bool,
}

/// Runs the whole profile sequence for `user_id` and persists the result.
///
/// The event count is captured before generation so decisions recorded meanwhile
/// count toward the next trigger. The final counters write is best-effort: if it
/// fails the trigger simply fires again later.
pub async fn generate_and_commit_profile(
    store: &dyn RecordStore,
    synthesizer: &dyn Synthesizer,
    policy: &PolicyConfig,
    user_id: Uuid,
) -> Result<GeneratedProfile, AppError> {
    let captured_count = store
        .get_user_counters(user_id)
        .await?
        .map(|c| c.total_events)
        .unwrap_or(0);

    let events = store.list_events(user_id, &EventFilter::default()).await?;
    if events.len() < policy.min_profile_events {
        return Err(AppError::InsufficientData(format!(
            "Not enough decisions to build a profile (have {}, need at least {})",
            events.len(),
            policy.min_profile_events
        )));
    }

    let previous = store.get_latest_profile(user_id).await?;
    let kind = if previous.is_some() {
        ProfileKind::Refinement
    } else {
        ProfileKind::Initial
    };

    info!(
        "Generating {} profile for user {} from {} events",
        kind.as_str(),
        user_id,
        events.len()
    );
    let content = generate_profile(
        synthesizer,
        &events,
        previous.as_ref().map(|p| &p.content),
        policy,
    )
    .await?;

    let profile = commit_profile(store, user_id, content, captured_count, kind).await?;

    let mark_updated = match update_generation_mark(store, user_id, captured_count).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Profile v{} saved but last-generation mark not updated for user {}: {e}",
                profile.version, user_id
            );
            false
        }
    };

    Ok(GeneratedProfile {
        profile,
        mark_updated,
    })
}

async fn update_generation_mark(
    store: &dyn RecordStore,
    user_id: Uuid,
    captured_count: i64,
) -> Result<(), AppError> {
    let Some(mut counters) = store.get_user_counters(user_id).await? else {
        return Err(AppError::NotFound(format!("counters for user {user_id}")));
    };
    counters.last_profile_event_count = captured_count;
    store.upsert_user_counters(&counters).await
}
