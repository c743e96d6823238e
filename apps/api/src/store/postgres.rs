//! PostgreSQL `RecordStore` backed by sqlx. Schema lives in `migrations/`.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::annotation::{Annotation, AnnotationCacheEntry, AnnotationPurpose};
use crate::models::counters::{UserCounters, UserPreferences};
use crate::models::digest::{DigestVersion, IncludedItem};
use crate::models::event::{Decision, EventFilter, ItemMetadata, PreferenceEvent};
use crate::models::profile::{NewProfile, ProfileContent, ProfileKind, ProfileVersion};
use crate::store::{already_scheduled, RecordStore};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CountersRow {
    user_id: Uuid,
    total_events: i64,
    like_count: i64,
    dislike_count: i64,
    last_profile_event_count: i64,
    preferences: Json<UserPreferences>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CountersRow> for UserCounters {
    fn from(row: CountersRow) -> Self {
        Self {
            user_id: row.user_id,
            total_events: row.total_events,
            like_count: row.like_count,
            dislike_count: row.dislike_count,
            last_profile_event_count: row.last_profile_event_count,
            preferences: row.preferences.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    user_id: Uuid,
    item_id: String,
    decision: String,
    source: String,
    title: String,
    score: i64,
    url: String,
    annotation: Option<Json<Annotation>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for PreferenceEvent {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let decision = row
            .decision
            .parse::<Decision>()
            .map_err(|e| AppError::Internal(anyhow!("event {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            item_id: row.item_id,
            decision,
            item: ItemMetadata {
                source: row.source,
                title: row.title,
                score: row.score,
                url: row.url,
            },
            annotation: row.annotation.map(|a| a.0),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    version: i32,
    event_count_at_generation: i64,
    kind: String,
    content: Json<ProfileContent>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for ProfileVersion {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let kind = ProfileKind::parse(&row.kind).ok_or_else(|| {
            AppError::Internal(anyhow!("profile {}: unknown kind '{}'", row.id, row.kind))
        })?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            version: row.version,
            event_count_at_generation: row.event_count_at_generation,
            kind,
            content: row.content.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DigestRow {
    id: Uuid,
    user_id: Uuid,
    subject: String,
    body_markdown: String,
    scheduled_for: DateTime<Utc>,
    included_items: Json<Vec<IncludedItem>>,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    scheduled_day: Option<NaiveDate>,
}

impl From<DigestRow> for DigestVersion {
    fn from(row: DigestRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            subject: row.subject,
            body_markdown: row.body_markdown,
            scheduled_for: row.scheduled_for,
            included_items: row.included_items.0,
            created_at: row.created_at,
            sent_at: row.sent_at,
            scheduled_day: row.scheduled_day,
        }
    }
}

#[derive(Debug, FromRow)]
struct AnnotationRow {
    item_id: String,
    purpose: String,
    content: Value,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get_user_counters(&self, user_id: Uuid) -> Result<Option<UserCounters>, AppError> {
        let row = sqlx::query_as::<_, CountersRow>("SELECT * FROM user_counters WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserCounters::from))
    }

    async fn upsert_user_counters(&self, counters: &UserCounters) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_counters
                (user_id, total_events, like_count, dislike_count,
                 last_profile_event_count, preferences, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                total_events = EXCLUDED.total_events,
                like_count = EXCLUDED.like_count,
                dislike_count = EXCLUDED.dislike_count,
                last_profile_event_count = EXCLUDED.last_profile_event_count,
                preferences = EXCLUDED.preferences,
                updated_at = NOW()
            "#,
        )
        .bind(counters.user_id)
        .bind(counters.total_events)
        .bind(counters.like_count)
        .bind(counters.dislike_count)
        .bind(counters.last_profile_event_count)
        .bind(Json(&counters.preferences))
        .bind(counters.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_or_update_event(
        &self,
        event: &PreferenceEvent,
    ) -> Result<Option<Decision>, AppError> {
        // The CTE reads the pre-statement snapshot, so it sees the old decision.
        let previous: Option<String> = sqlx::query_scalar(
            r#"
            WITH prev AS (
                SELECT decision FROM preference_events
                WHERE user_id = $2 AND item_id = $3
            )
            INSERT INTO preference_events
                (id, user_id, item_id, decision, source, title, score, url, annotation, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, item_id) DO UPDATE SET
                decision = EXCLUDED.decision,
                annotation = EXCLUDED.annotation
            RETURNING (SELECT decision FROM prev)
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.item_id)
        .bind(event.decision.as_str())
        .bind(&event.item.source)
        .bind(&event.item.title)
        .bind(event.item.score)
        .bind(&event.item.url)
        .bind(event.annotation.as_ref().map(Json))
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await?;

        previous
            .map(|d| d.parse::<Decision>().map_err(|e| AppError::Internal(anyhow!(e))))
            .transpose()
    }

    async fn list_events(
        &self,
        user_id: Uuid,
        filter: &EventFilter,
    ) -> Result<Vec<PreferenceEvent>, AppError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT * FROM preference_events
            WHERE user_id = $1
              AND ($2::text IS NULL OR decision = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(filter.decision.map(|d| d.as_str()))
        .bind(filter.since)
        .bind(filter.limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PreferenceEvent::try_from).collect()
    }

    async fn seen_item_ids(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        Ok(
            sqlx::query_scalar("SELECT item_id FROM preference_events WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_latest_profile(&self, user_id: Uuid) -> Result<Option<ProfileVersion>, AppError> {
        sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM profile_versions WHERE user_id = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(ProfileVersion::try_from)
        .transpose()
    }

    async fn list_profiles(&self, user_id: Uuid) -> Result<Vec<ProfileVersion>, AppError> {
        sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM profile_versions WHERE user_id = $1 ORDER BY version DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ProfileVersion::try_from)
        .collect()
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileVersion, AppError> {
        // Append-only. UNIQUE (user_id, version) rejects a racing duplicate.
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profile_versions
                (id, user_id, version, event_count_at_generation, kind, content)
            SELECT $1, $2, COALESCE(MAX(version), 0) + 1, $3, $4, $5
            FROM profile_versions
            WHERE user_id = $2
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(profile.user_id)
        .bind(profile.event_count_at_generation)
        .bind(profile.kind.as_str())
        .bind(Json(&profile.content))
        .fetch_one(&self.pool)
        .await?;

        ProfileVersion::try_from(row)
    }

    async fn get_latest_digest(&self, user_id: Uuid) -> Result<Option<DigestVersion>, AppError> {
        let row = sqlx::query_as::<_, DigestRow>(
            "SELECT * FROM digest_versions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DigestVersion::from))
    }

    async fn list_digests(&self, user_id: Uuid) -> Result<Vec<DigestVersion>, AppError> {
        let rows = sqlx::query_as::<_, DigestRow>(
            "SELECT * FROM digest_versions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DigestVersion::from).collect())
    }

    async fn insert_digest(&self, digest: &DigestVersion) -> Result<(), AppError> {
        // NULL scheduled_day never conflicts, so on-demand digests always insert.
        let result = sqlx::query(
            r#"
            INSERT INTO digest_versions
                (id, user_id, subject, body_markdown, scheduled_for, included_items, created_at, sent_at, scheduled_day)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, scheduled_day) DO NOTHING
            "#,
        )
        .bind(digest.id)
        .bind(digest.user_id)
        .bind(&digest.subject)
        .bind(&digest.body_markdown)
        .bind(digest.scheduled_for)
        .bind(Json(&digest.included_items))
        .bind(digest.created_at)
        .bind(digest.sent_at)
        .bind(digest.scheduled_day)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(already_scheduled(digest));
        }
        Ok(())
    }

    async fn get_annotation(
        &self,
        item_id: &str,
        purpose: AnnotationPurpose,
    ) -> Result<Option<AnnotationCacheEntry>, AppError> {
        let row = sqlx::query_as::<_, AnnotationRow>(
            "SELECT * FROM annotation_cache WHERE item_id = $1 AND purpose = $2",
        )
        .bind(item_id)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| {
            AnnotationPurpose::parse(&r.purpose).map(|purpose| AnnotationCacheEntry {
                item_id: r.item_id,
                purpose,
                content: r.content,
                created_at: r.created_at,
            })
        }))
    }

    async fn upsert_annotation(&self, entry: &AnnotationCacheEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO annotation_cache (item_id, purpose, content, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (item_id, purpose) DO UPDATE SET
                content = EXCLUDED.content,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&entry.item_id)
        .bind(entry.purpose.as_str())
        .bind(&entry.content)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
