//! Relationship edits followed by a rebuild.
//!
//! [`MutationCoordinator`] applies add-parent edits through the gateway and
//! then rebuilds the session's current root, so the displayed tree always
//! reflects the latest accepted edit. Edits are queued: a second call waits
//! until the first one's edit and rebuild are both done.

use crate::domain::PersonId;
use crate::error::MutationError;
use crate::gateway::PersonRecordGateway;
use crate::session::{BuildSession, Generation};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of an accepted edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// The person who gained a parent
    pub child: PersonId,
    /// The linked parent
    pub parent: PersonId,
    /// Generation started to rebuild the current root, if there was one
    pub rebuild: Option<Generation>,
}

/// Serializes relationship edits and the rebuilds they trigger.
pub struct MutationCoordinator {
    gateway: Arc<dyn PersonRecordGateway>,
    session: BuildSession,
    queue: Mutex<()>,
}

impl MutationCoordinator {
    /// Create a coordinator editing through `gateway` and rebuilding in
    /// `session`.
    pub fn new(gateway: Arc<dyn PersonRecordGateway>, session: BuildSession) -> Self {
        Self {
            gateway,
            session,
            queue: Mutex::new(()),
        }
    }

    /// Add `parent` as a parent of `child`, then rebuild the current root.
    ///
    /// Returns once the rebuild has settled. A root change made meanwhile
    /// may supersede the rebuild; the edit itself stays applied.
    ///
    /// # Errors
    ///
    /// - `MutationError::SelfReference` if `child == parent`; the gateway is
    ///   not called
    /// - `MutationError::Rejected` if the gateway refuses; no rebuild starts
    pub async fn add_parent(
        &self,
        child: &PersonId,
        parent: &PersonId,
    ) -> Result<MutationOutcome, MutationError> {
        if child == parent {
            return Err(MutationError::SelfReference(child.clone()));
        }

        let _queued = self.queue.lock().await;

        if let Err(e) = self.gateway.add_parent_edge(child, parent).await {
            tracing::warn!(%child, %parent, error = %e, "Parent edit rejected");
            return Err(MutationError::Rejected {
                child: child.clone(),
                parent: parent.clone(),
                reason: e.to_string(),
            });
        }
        tracing::info!(%child, %parent, "Parent added");

        let rebuild = match self.session.current_request().await {
            Some(request) => {
                let generation = self
                    .session
                    .start_with_depth(request.root, request.max_depth)
                    .await;
                self.session.wait(generation).await;
                Some(generation)
            }
            None => None,
        };

        Ok(MutationOutcome {
            child: child.clone(),
            parent: parent.clone(),
            rebuild,
        })
    }
}
