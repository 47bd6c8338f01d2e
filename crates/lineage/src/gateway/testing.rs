//! Scriptable gateway for exercising build sessions.
//!
//! Available in this crate's tests and, for downstream crates, with the
//! `test-util` feature:
//!
//! ```toml
//! [dev-dependencies]
//! lineage = { version = "...", features = ["test-util"] }
//! ```

use super::{InMemoryGateway, PersonRecordGateway};
use crate::domain::{PersonId, PersonRecord};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::{Mutex, watch};

/// Gateway wrapper whose fetches can be held open or made to fail.
///
/// # Behavior
///
/// - `hold(id)`: fetches of `id` wait until `release(id)` or `release_all()`
/// - `fail(id)`: fetches of `id` return `GatewayError::Unavailable`
/// - `reject_edits(reason)`: every `add_parent_edge` returns `Rejected`
/// - everything else is delegated to the wrapped [`InMemoryGateway`]
pub struct ScriptedGateway {
    inner: InMemoryGateway,
    held: watch::Sender<HashSet<PersonId>>,
    waiting: watch::Sender<usize>,
    failing: Mutex<HashSet<PersonId>>,
    edit_rejection: Mutex<Option<String>>,
}

/// Decrements the waiting counter even if the fetch future is dropped.
struct WaitingGuard<'a>(&'a watch::Sender<usize>);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl ScriptedGateway {
    /// Wrap an in-memory gateway.
    pub fn new(inner: InMemoryGateway) -> Self {
        Self {
            inner,
            held: watch::Sender::new(HashSet::new()),
            waiting: watch::Sender::new(0),
            failing: Mutex::new(HashSet::new()),
            edit_rejection: Mutex::new(None),
        }
    }

    /// Make fetches of `id` wait until released.
    pub fn hold(&self, id: impl Into<PersonId>) {
        let id = id.into();
        self.held.send_modify(|held| {
            held.insert(id);
        });
    }

    /// Let held fetches of `id` proceed.
    pub fn release(&self, id: impl Into<PersonId>) {
        let id = id.into();
        self.held.send_modify(|held| {
            held.remove(&id);
        });
    }

    /// Let every held fetch proceed.
    pub fn release_all(&self) {
        self.held.send_modify(HashSet::clear);
    }

    /// Make fetches of `id` fail.
    pub async fn fail(&self, id: impl Into<PersonId>) {
        self.failing.lock().await.insert(id.into());
    }

    /// Refuse every edit with `reason`.
    pub async fn reject_edits(&self, reason: &str) {
        *self.edit_rejection.lock().await = Some(reason.to_string());
    }

    /// Wait until at least `count` fetches are parked on held IDs.
    pub async fn wait_for_waiting(&self, count: usize) {
        let mut rx = self.waiting.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    /// How many times `id` reached the wrapped gateway.
    pub async fn fetch_count(&self, id: &PersonId) -> usize {
        self.inner.fetch_count(id).await
    }
}

#[async_trait]
impl PersonRecordGateway for ScriptedGateway {
    async fn fetch_person(&self, id: &PersonId) -> Result<Option<PersonRecord>, GatewayError> {
        let mut held = self.held.subscribe();
        if held.borrow_and_update().contains(id) {
            self.waiting.send_modify(|n| *n += 1);
            let _guard = WaitingGuard(&self.waiting);
            let _ = held.wait_for(|ids| !ids.contains(id)).await;
        }

        if self.failing.lock().await.contains(id) {
            return Err(GatewayError::Unavailable(format!(
                "scripted failure for {}",
                id
            )));
        }

        self.inner.fetch_person(id).await
    }

    async fn add_parent_edge(
        &self,
        child: &PersonId,
        parent: &PersonId,
    ) -> Result<(), GatewayError> {
        if let Some(reason) = self.edit_rejection.lock().await.clone() {
            return Err(GatewayError::Rejected(reason));
        }
        self.inner.add_parent_edge(child, parent).await
    }
}
