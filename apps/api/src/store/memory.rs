//! Process-local `RecordStore`. Used when no database is configured and in tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::annotation::{AnnotationCacheEntry, AnnotationPurpose};
use crate::models::counters::UserCounters;
use crate::models::digest::DigestVersion;
use crate::models::event::{Decision, EventFilter, PreferenceEvent};
use crate::models::profile::{NewProfile, ProfileVersion};
use crate::store::{already_scheduled, RecordStore};

#[derive(Default)]
struct Tables {
    counters: HashMap<Uuid, UserCounters>,
    events: Vec<PreferenceEvent>,
    profiles: Vec<ProfileVersion>,
    digests: Vec<DigestVersion>,
    annotations: HashMap<(String, AnnotationPurpose), AnnotationCacheEntry>,
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a half-written row behind.
        self.tables.lock().unwrap_or_else(|err| err.into_inner())
    }
}

fn newest_first<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_user_counters(&self, user_id: Uuid) -> Result<Option<UserCounters>, AppError> {
        Ok(self.tables().counters.get(&user_id).cloned())
    }

    async fn upsert_user_counters(&self, counters: &UserCounters) -> Result<(), AppError> {
        let mut row = counters.clone();
        row.updated_at = Utc::now();
        self.tables().counters.insert(counters.user_id, row);
        Ok(())
    }

    async fn append_or_update_event(
        &self,
        event: &PreferenceEvent,
    ) -> Result<Option<Decision>, AppError> {
        let mut tables = self.tables();
        let existing = tables
            .events
            .iter_mut()
            .find(|e| e.user_id == event.user_id && e.item_id == event.item_id);
        match existing {
            Some(row) => {
                let previous = row.decision;
                row.decision = event.decision;
                row.annotation = event.annotation.clone();
                Ok(Some(previous))
            }
            None => {
                tables.events.push(event.clone());
                Ok(None)
            }
        }
    }

    async fn list_events(
        &self,
        user_id: Uuid,
        filter: &EventFilter,
    ) -> Result<Vec<PreferenceEvent>, AppError> {
        let rows: Vec<_> = self
            .tables()
            .events
            .iter()
            .filter(|e| e.user_id == user_id && filter.matches(e))
            .cloned()
            .collect();
        let mut rows = newest_first(rows, |e| e.created_at);
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn seen_item_ids(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        Ok(self
            .tables()
            .events
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.item_id.clone())
            .collect())
    }

    async fn get_latest_profile(&self, user_id: Uuid) -> Result<Option<ProfileVersion>, AppError> {
        Ok(self
            .tables()
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .max_by_key(|p| p.version)
            .cloned())
    }

    async fn list_profiles(&self, user_id: Uuid) -> Result<Vec<ProfileVersion>, AppError> {
        let rows: Vec<_> = self
            .tables()
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p| p.version))
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileVersion, AppError> {
        let mut tables = self.tables();
        let current_max = tables
            .profiles
            .iter()
            .filter(|p| p.user_id == profile.user_id)
            .map(|p| p.version)
            .max();
        let row = ProfileVersion {
            id: Uuid::new_v4(),
            user_id: profile.user_id,
            version: current_max.unwrap_or(0) + 1,
            event_count_at_generation: profile.event_count_at_generation,
            kind: profile.kind,
            content: profile.content,
            created_at: Utc::now(),
        };
        tables.profiles.push(row.clone());
        Ok(row)
    }

    async fn get_latest_digest(&self, user_id: Uuid) -> Result<Option<DigestVersion>, AppError> {
        Ok(self
            .tables()
            .digests
            .iter()
            .filter(|d| d.user_id == user_id)
            .max_by_key(|d| d.created_at)
            .cloned())
    }

    async fn list_digests(&self, user_id: Uuid) -> Result<Vec<DigestVersion>, AppError> {
        let rows: Vec<_> = self
            .tables()
            .digests
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |d| d.created_at))
    }

    async fn insert_digest(&self, digest: &DigestVersion) -> Result<(), AppError> {
        let mut tables = self.tables();
        if digest.scheduled_day.is_some()
            && tables.digests.iter().any(|d| {
                d.user_id == digest.user_id && d.scheduled_day == digest.scheduled_day
            })
        {
            return Err(already_scheduled(digest));
        }
        tables.digests.push(digest.clone());
        Ok(())
    }

    async fn get_annotation(
        &self,
        item_id: &str,
        purpose: AnnotationPurpose,
    ) -> Result<Option<AnnotationCacheEntry>, AppError> {
        Ok(self
            .tables()
            .annotations
            .get(&(item_id.to_string(), purpose))
            .cloned())
    }

    async fn upsert_annotation(&self, entry: &AnnotationCacheEntry) -> Result<(), AppError> {
        self.tables()
            .annotations
            .insert((entry.item_id.clone(), entry.purpose), entry.clone());
        Ok(())
    }
}
