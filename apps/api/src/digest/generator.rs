//! Digest Generator: recent likes plus the current profile in, dated digest out.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::digest::prompts::{DIGEST_PROMPT_TEMPLATE, DIGEST_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::truncate;
use crate::llm_client::{synthesize_json, Synthesizer};
use crate::models::digest::{DigestContent, DigestVersion, IncludedItem};
use crate::models::event::{EventFilter, PreferenceEvent};
use crate::models::profile::ProfileContent;
use crate::store::RecordStore;

const DIGEST_TITLE_CHARS: usize = 50;
pub const MAX_INCLUDED_ITEMS: usize = 10;
pub const FALLBACK_REASON: &str = "Matched your interests";

pub fn build_digest_prompt(
    liked: &[PreferenceEvent],
    profile: &ProfileContent,
    prompt_window: usize,
) -> String {
    let liked_lines = liked
        .iter()
        .take(prompt_window)
        .map(|e| format!("- r/{}: {}", e.item.source, truncate(&e.item.title, DIGEST_TITLE_CHARS)))
        .collect::<Vec<_>>()
        .join("\n");

    DIGEST_PROMPT_TEMPLATE
        .replace(
            "{interests}",
            &profile.intellectual_profile.primary_interests.join(", "),
        )
        .replace("{liked_lines}", &liked_lines)
}

/// The first ten source events, each with the annotation's key insight as its reason.
pub fn included_items(liked: &[PreferenceEvent]) -> Vec<IncludedItem> {
    liked
        .iter()
        .take(MAX_INCLUDED_ITEMS)
        .map(|e| IncludedItem {
            item_id: e.item_id.clone(),
            title: e.item.title.clone(),
            source: e.item.source.clone(),
            reason: e
                .annotation
                .as_ref()
                .map(|a| a.key_insight.trim())
                .filter(|s| !s.is_empty())
                .unwrap_or(FALLBACK_REASON)
                .to_string(),
        })
        .collect()
}

/// Synthesizes subject and body from newest-first likes.
pub async fn generate_digest(
    synthesizer: &dyn Synthesizer,
    liked: &[PreferenceEvent],
    profile: &ProfileContent,
    policy: &PolicyConfig,
) -> Result<DigestContent, AppError> {
    let prompt = build_digest_prompt(liked, profile, policy.digest_prompt_window);
    let content: DigestContent = synthesize_json(synthesizer, &prompt, DIGEST_SYSTEM)
        .await
        .map_err(|e| AppError::from_llm("digest generation", e))?;

    if content.subject.trim().is_empty() || content.body_markdown.trim().is_empty() {
        return Err(AppError::MalformedResponse(
            "digest generation: subject or body is empty".to_string(),
        ));
    }
    Ok(content)
}

/// Builds, synthesizes and inserts a digest. Nothing is written if synthesis fails.
/// A `scheduled_day` is claimed through the store's unique key, so of two
/// overlapping scheduled runs only one inserts.
#[allow(clippy::too_many_arguments)]
async fn generate_and_store(
    store: &dyn RecordStore,
    synthesizer: &dyn Synthesizer,
    policy: &PolicyConfig,
    user_id: Uuid,
    liked: &[PreferenceEvent],
    profile: &ProfileContent,
    now: DateTime<Utc>,
    scheduled_day: Option<NaiveDate>,
) -> Result<DigestVersion, AppError> {
    let content = generate_digest(synthesizer, liked, profile, policy).await?;

    let digest = DigestVersion {
        id: Uuid::new_v4(),
        user_id,
        subject: content.subject,
        body_markdown: content.body_markdown,
        scheduled_for: now,
        included_items: included_items(liked),
        created_at: now,
        sent_at: None,
        scheduled_day,
    };
    store.insert_digest(&digest).await?;

    info!(
        "Stored digest {} '{}' with {} items for user {}",
        digest.id,
        digest.subject,
        digest.included_items.len(),
        user_id
    );
    Ok(digest)
}

async fn latest_profile_content(
    store: &dyn RecordStore,
    user_id: Uuid,
) -> Result<ProfileContent, AppError> {
    store
        .get_latest_profile(user_id)
        .await?
        .map(|p| p.content)
        .ok_or_else(|| {
            AppError::NotFound("No dossier found. Generate a DNA dossier first.".to_string())
        })
}

/// On-demand digest. Not limited to one per day.
pub async fn generate_on_demand_digest(
    store: &dyn RecordStore,
    synthesizer: &dyn Synthesizer,
    policy: &PolicyConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DigestVersion, AppError> {
    let profile = latest_profile_content(store, user_id).await?;

    let liked = store
        .list_events(user_id, &EventFilter::likes().limit(policy.digest_window))
        .await?;
    if liked.len() < policy.min_digest_likes {
        return Err(AppError::InsufficientData(format!(
            "Not enough liked posts to generate a digest (have {}, need {})",
            liked.len(),
            policy.min_digest_likes
        )));
    }

    generate_and_store(store, synthesizer, policy, user_id, &liked, &profile, now, None).await
}

/// Scheduled digest. Skips with `AlreadySatisfied` when the newsletter is turned
/// off or a digest already exists for the current calendar day.
pub async fn run_scheduled_digest(
    store: &dyn RecordStore,
    synthesizer: &dyn Synthesizer,
    policy: &PolicyConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DigestVersion, AppError> {
    let enabled = store
        .get_user_counters(user_id)
        .await?
        .map_or(true, |c| c.preferences.newsletter_enabled);
    if !enabled {
        return Err(AppError::AlreadySatisfied(
            "Newsletter disabled by preference".to_string(),
        ));
    }

    if let Some(latest) = store.get_latest_digest(user_id).await? {
        if latest.created_at >= start_of_day(now, policy.digest_day_offset) {
            return Err(AppError::AlreadySatisfied(format!(
                "Digest {} already created today",
                latest.id
            )));
        }
    }

    let profile = latest_profile_content(store, user_id).await?;

    let filter = EventFilter::likes()
        .since(now - policy.scheduled_digest_lookback)
        .limit(policy.digest_window);
    let liked = store.list_events(user_id, &filter).await?;
    if liked.len() < policy.min_scheduled_digest_likes {
        return Err(AppError::InsufficientData(format!(
            "Not enough recent likes for a scheduled digest (have {}, need {})",
            liked.len(),
            policy.min_scheduled_digest_likes
        )));
    }

    let day = now.with_timezone(&policy.digest_day_offset).date_naive();
    generate_and_store(store, synthesizer, policy, user_id, &liked, &profile, now, Some(day)).await
}

/// Midnight of `now`'s calendar day in `offset`, as a UTC instant.
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_date = now.with_timezone(&offset).date_naive();
    let midnight = local_date.and_time(NaiveTime::MIN);
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}
