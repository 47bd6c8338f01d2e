//! Per-build memoization of person records.
//!
//! A [`PersonCache`] lives for exactly one build. The first request for an ID
//! goes to the gateway; every later request in the same build, including
//! requests that arrive while the first fetch is still in flight, gets the
//! same stored outcome. Not-found and failed fetches are stored too, so a
//! broken reference costs one gateway call per build no matter how many
//! branches point at it.
//!
//! # Coalescing
//!
//! Each ID maps to a `tokio::sync::OnceCell`. Concurrent callers for the
//! same ID wait on the cell while one of them runs the fetch. If that
//! caller's future is dropped mid-fetch, a waiting caller takes over.
//!
//! # Fetch Limit
//!
//! A semaphore caps gateway calls in flight for the build, so fanning out
//! over a wide generation does not flood the record source.

use crate::domain::{PersonId, PersonRecord};
use crate::gateway::PersonRecordGateway;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OnceCell, Semaphore};

/// Stored outcome of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// The gateway returned a record.
    Found(Arc<PersonRecord>),

    /// The gateway has no record for the ID.
    NotFound,

    /// The gateway call failed; not retried within this build.
    Failed(String),
}

impl CacheEntry {
    /// The record, if one was found.
    pub fn record(&self) -> Option<&Arc<PersonRecord>> {
        match self {
            CacheEntry::Found(record) => Some(record),
            CacheEntry::NotFound | CacheEntry::Failed(_) => None,
        }
    }

    /// Human-readable reason for a missing record.
    pub fn unresolved_reason(&self) -> Option<String> {
        match self {
            CacheEntry::Found(_) => None,
            CacheEntry::NotFound => Some("not found".to_string()),
            CacheEntry::Failed(reason) => Some(reason.clone()),
        }
    }
}

/// Memoizing, coalescing front for a [`PersonRecordGateway`].
pub struct PersonCache {
    gateway: Arc<dyn PersonRecordGateway>,
    entries: Mutex<HashMap<PersonId, Arc<OnceCell<CacheEntry>>>>,
    permits: Semaphore,
    fetches: AtomicUsize,
}

impl PersonCache {
    /// Create an empty cache allowing `max_concurrent_fetches` gateway calls
    /// in flight (at least one).
    pub fn new(gateway: Arc<dyn PersonRecordGateway>, max_concurrent_fetches: usize) -> Self {
        Self {
            gateway,
            entries: Mutex::new(HashMap::new()),
            permits: Semaphore::new(max_concurrent_fetches.max(1)),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Resolve `id`, fetching it on first use.
    pub async fn get(&self, id: &PersonId) -> CacheEntry {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(id.clone()).or_default())
        };

        cell.get_or_init(|| self.fetch(id)).await.clone()
    }

    /// Resolve `id` to a record, treating tombstones as absent.
    pub async fn get_record(&self, id: &PersonId) -> Option<Arc<PersonRecord>> {
        self.get(id).await.record().cloned()
    }

    /// Number of gateway calls issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of IDs with a stored or pending entry.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether nothing has been requested yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn fetch(&self, id: &PersonId) -> CacheEntry {
        let Ok(_permit) = self.permits.acquire().await else {
            return CacheEntry::Failed("fetch limiter closed".to_string());
        };

        self.fetches.fetch_add(1, Ordering::Relaxed);
        match self.gateway.fetch_person(id).await {
            Ok(Some(record)) => CacheEntry::Found(Arc::new(record)),
            Ok(None) => {
                tracing::debug!(person = %id, "Person record not found");
                CacheEntry::NotFound
            }
            Err(e) => {
                tracing::warn!(person = %id, error = %e, "Person fetch failed");
                CacheEntry::Failed(e.to_string())
            }
        }
    }
}
