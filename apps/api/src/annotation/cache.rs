//! Get-or-create over the annotation table with a freshness window.
//!
//! Last write wins: two producers racing on one key may both run, and whichever
//! upsert lands last is what later readers see.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::annotation::{AnnotationCacheEntry, AnnotationPurpose};
use crate::store::RecordStore;

/// Entry age strictly below `ttl` counts as fresh.
pub fn is_fresh(entry: &AnnotationCacheEntry, ttl: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(entry.created_at) < ttl
}

/// Returns `(value, from_cache)`.
///
/// A producer failure is returned as-is and nothing is cached. A failed cache
/// write is logged and the produced value is still returned.
pub async fn get_or_create_annotation<T, F, Fut>(
    store: &dyn RecordStore,
    item_id: &str,
    purpose: AnnotationPurpose,
    ttl: Duration,
    now: DateTime<Utc>,
    producer: F,
) -> Result<(T, bool), AppError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if let Some(entry) = store.get_annotation(item_id, purpose).await? {
        if is_fresh(&entry, ttl, now) {
            match serde_json::from_value::<T>(entry.content) {
                Ok(value) => {
                    debug!("Annotation cache hit for {purpose}/{item_id}");
                    return Ok((value, true));
                }
                Err(e) => warn!("Discarding unreadable {purpose} annotation for {item_id}: {e}"),
            }
        } else {
            debug!("Annotation for {purpose}/{item_id} is stale; regenerating");
        }
    }

    let value = producer().await?;

    let content = serde_json::to_value(&value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serializing annotation: {e}")))?;
    let entry = AnnotationCacheEntry {
        item_id: item_id.to_string(),
        purpose,
        content,
        created_at: now,
    };
    if let Err(e) = store.upsert_annotation(&entry).await {
        warn!("Could not cache {purpose} annotation for {item_id}: {e}");
    }

    Ok((value, false))
}
