//! Record Store: the only shared resource between operations.
//!
//! Every write is either an upsert on a unique key or an insert of a new
//! immutable row, so no cross-operation locking is required.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::annotation::{AnnotationCacheEntry, AnnotationPurpose};
use crate::models::counters::UserCounters;
use crate::models::digest::DigestVersion;
use crate::models::event::{Decision, EventFilter, PreferenceEvent};
use crate::models::profile::{NewProfile, ProfileVersion};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user_counters(&self, user_id: Uuid) -> Result<Option<UserCounters>, AppError>;

    /// Full-row overwrite keyed by `counters.user_id`.
    async fn upsert_user_counters(&self, counters: &UserCounters) -> Result<(), AppError>;

    /// Inserts the event, or overwrites `decision` and `annotation` of the
    /// existing (user_id, item_id) row. Returns the decision the row held before.
    async fn append_or_update_event(
        &self,
        event: &PreferenceEvent,
    ) -> Result<Option<Decision>, AppError>;

    /// Events newest first (`created_at` descending).
    async fn list_events(
        &self,
        user_id: Uuid,
        filter: &EventFilter,
    ) -> Result<Vec<PreferenceEvent>, AppError>;

    /// Ids of every item the user has decided on.
    async fn seen_item_ids(&self, user_id: Uuid) -> Result<Vec<String>, AppError>;

    async fn get_latest_profile(&self, user_id: Uuid) -> Result<Option<ProfileVersion>, AppError>;

    /// All versions, newest first.
    async fn list_profiles(&self, user_id: Uuid) -> Result<Vec<ProfileVersion>, AppError>;

    /// Appends a profile as `max(version) + 1` (1 for the first).
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileVersion, AppError>;

    async fn get_latest_digest(&self, user_id: Uuid) -> Result<Option<DigestVersion>, AppError>;

    /// All digests, newest first.
    async fn list_digests(&self, user_id: Uuid) -> Result<Vec<DigestVersion>, AppError>;

    /// Inserts a digest. A second digest for the same `(user_id, scheduled_day)`
    /// is rejected with `AlreadySatisfied`.
    async fn insert_digest(&self, digest: &DigestVersion) -> Result<(), AppError>;

    async fn get_annotation(
        &self,
        item_id: &str,
        purpose: AnnotationPurpose,
    ) -> Result<Option<AnnotationCacheEntry>, AppError>;

    /// Last write wins on (item_id, purpose).
    async fn upsert_annotation(&self, entry: &AnnotationCacheEntry) -> Result<(), AppError>;
}

pub(crate) fn already_scheduled(digest: &DigestVersion) -> AppError {
    let day = digest
        .scheduled_day
        .map(|d| d.to_string())
        .unwrap_or_default();
    AppError::AlreadySatisfied(format!("Scheduled digest for {day} already exists"))
}
