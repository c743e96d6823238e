use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use uuid::Uuid;

/// The single account this deployment serves.
pub const DEFAULT_USER_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs on the in-memory record store.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub user_id: Uuid,
    /// When set, the scheduled digest endpoint requires `Bearer <secret>`.
    pub cron_secret: Option<String>,
    pub reddit_base_url: String,
    pub reddit_user_agent: String,
    pub synthesis_timeout: Duration,
    pub request_timeout: Duration,
    /// Zero disables the in-process digest scheduler.
    pub digest_scheduler_interval: Duration,
    pub policy: PolicyConfig,
}

/// Thresholds and window sizes for profile and digest generation.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub initial_threshold: i64,
    pub refinement_interval: i64,
    /// Most recent likes (and, separately, dislikes) shown to the profile synthesizer.
    pub profile_window: usize,
    pub min_profile_events: usize,
    /// Likes loaded as the digest source window.
    pub digest_window: usize,
    /// Likes from the source window listed in the digest prompt.
    pub digest_prompt_window: usize,
    pub min_digest_likes: usize,
    pub min_scheduled_digest_likes: usize,
    pub scheduled_digest_lookback: chrono::Duration,
    pub annotation_ttl: chrono::Duration,
    /// Offset used to decide which calendar day a digest belongs to.
    pub digest_day_offset: FixedOffset,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 500,
            refinement_interval: 250,
            profile_window: 30,
            min_profile_events: 50,
            digest_window: 20,
            digest_prompt_window: 10,
            min_digest_likes: 5,
            min_scheduled_digest_likes: 3,
            scheduled_digest_lookback: chrono::Duration::days(7),
            annotation_ttl: chrono::Duration::hours(24),
            digest_day_offset: Utc.fix(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = PolicyConfig::default();
        let offset_minutes: i32 = optional_env("DIGEST_UTC_OFFSET_MINUTES", 0)?;
        let digest_day_offset = day_offset(offset_minutes)?;

        let policy = PolicyConfig {
            initial_threshold: optional_env("INITIAL_THRESHOLD", defaults.initial_threshold)?,
            refinement_interval: optional_env("REFINEMENT_INTERVAL", defaults.refinement_interval)?,
            profile_window: optional_env("PROFILE_WINDOW", defaults.profile_window)?,
            min_profile_events: optional_env("MIN_PROFILE_EVENTS", defaults.min_profile_events)?,
            digest_window: optional_env("DIGEST_WINDOW", defaults.digest_window)?,
            digest_prompt_window: optional_env(
                "DIGEST_PROMPT_WINDOW",
                defaults.digest_prompt_window,
            )?,
            min_digest_likes: optional_env("MIN_DIGEST_LIKES", defaults.min_digest_likes)?,
            min_scheduled_digest_likes: optional_env(
                "MIN_SCHEDULED_DIGEST_LIKES",
                defaults.min_scheduled_digest_likes,
            )?,
            scheduled_digest_lookback: chrono::Duration::days(optional_env(
                "SCHEDULED_DIGEST_LOOKBACK_DAYS",
                7,
            )?),
            annotation_ttl: chrono::Duration::hours(optional_env("ANNOTATION_TTL_HOURS", 24)?),
            digest_day_offset,
        };

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            user_id: optional_env("USER_ID", Uuid::parse_str(DEFAULT_USER_ID)?)?,
            cron_secret: std::env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            reddit_base_url: std::env::var("REDDIT_BASE_URL")
                .unwrap_or_else(|_| "https://www.reddit.com".to_string()),
            reddit_user_agent: std::env::var("REDDIT_USER_AGENT")
                .unwrap_or_else(|_| format!("RedditDNA/{}", env!("CARGO_PKG_VERSION"))),
            synthesis_timeout: Duration::from_secs(optional_env("SYNTHESIS_TIMEOUT_SECS", 30)?),
            request_timeout: Duration::from_secs(optional_env("REQUEST_TIMEOUT_SECS", 60)?),
            digest_scheduler_interval: Duration::from_secs(optional_env(
                "DIGEST_SCHEDULER_INTERVAL_SECS",
                0,
            )?),
            policy,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        _ => Ok(default),
    }
}

fn day_offset(minutes: i32) -> Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .context("DIGEST_UTC_OFFSET_MINUTES must be within +/- 24h")
}
