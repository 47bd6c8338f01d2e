//! Entry point for consumers driving a tree view.

use crate::config::TraversalConfig;
use crate::display::DisplayTree;
use crate::domain::PersonId;
use crate::error::{BuildError, MutationError};
use crate::gateway::PersonRecordGateway;
use crate::mutation::{MutationCoordinator, MutationOutcome};
use crate::session::{BuildObserver, BuildSession, Generation};
use std::sync::Arc;

/// Facade over a [`BuildSession`] and its [`MutationCoordinator`].
///
/// Selecting a root, editing parents, and cancelling all go through here;
/// results arrive through the [`BuildObserver`] or the session's state
/// channel.
pub struct AncestryController {
    session: BuildSession,
    mutations: MutationCoordinator,
}

impl AncestryController {
    /// Create a controller over `gateway`.
    pub fn new(gateway: Arc<dyn PersonRecordGateway>, config: TraversalConfig) -> Self {
        let session = BuildSession::new(Arc::clone(&gateway), config);
        Self::from_session(gateway, session)
    }

    /// Create a controller that reports builds to `observer`.
    pub fn with_observer(
        gateway: Arc<dyn PersonRecordGateway>,
        config: TraversalConfig,
        observer: Arc<dyn BuildObserver>,
    ) -> Self {
        let session = BuildSession::with_observer(Arc::clone(&gateway), config, observer);
        Self::from_session(gateway, session)
    }

    fn from_session(gateway: Arc<dyn PersonRecordGateway>, session: BuildSession) -> Self {
        let mutations = MutationCoordinator::new(gateway, session.clone());
        Self { session, mutations }
    }

    /// The underlying session.
    pub fn session(&self) -> &BuildSession {
        &self.session
    }

    /// Build the tree for `root`. `None` uses the configured depth.
    pub async fn request_build(&self, root: PersonId, max_depth: Option<usize>) -> Generation {
        let depth = max_depth.unwrap_or(self.session.config().max_depth);
        self.session.start_with_depth(root, depth).await
    }

    /// Build the tree for `root` and wait for it.
    ///
    /// # Errors
    ///
    /// The build's error, or `BuildError::Superseded` if another request
    /// replaced it first.
    pub async fn build_tree(
        &self,
        root: PersonId,
        max_depth: Option<usize>,
    ) -> Result<Arc<DisplayTree>, BuildError> {
        let generation = self.request_build(root, max_depth).await;
        self.session.wait_for_tree(generation).await
    }

    /// Add `parent` as a parent of `child` and rebuild the current root.
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::add_parent`].
    pub async fn request_add_parent(
        &self,
        child: &PersonId,
        parent: &PersonId,
    ) -> Result<MutationOutcome, MutationError> {
        self.mutations.add_parent(child, parent).await
    }

    /// Cancel the build in progress, if any.
    pub async fn cancel_current_build(&self) -> Option<Generation> {
        self.session.cancel().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::domain::{ParentRef, PersonRecord};
    use crate::gateway::InMemoryGateway;
    use crate::gateway::testing::ScriptedGateway;
    use crate::session::SessionState;

    fn chain() -> InMemoryGateway {
        let mut records = Vec::new();
        for i in 1..=5u64 {
            let mut record = PersonRecord::new(i, &format!("Gen{}", i), "Line");
            if i < 5 {
                record.parents = vec![ParentRef::new(i + 1, None)];
            }
            records.push(record);
        }
        InMemoryGateway::with_records(records, GatewayConfig::default())
    }

    #[tokio::test]
    async fn test_request_build_uses_configured_depth() {
        let controller = AncestryController::new(Arc::new(chain()), TraversalConfig::default());

        let tree = controller.build_tree(PersonId::new("1"), None).await.unwrap();
        assert_eq!(tree.root.depth(), 2);

        let tree = controller.build_tree(PersonId::new("1"), Some(4)).await.unwrap();
        assert_eq!(tree.root.depth(), 4);
    }

    #[tokio::test]
    async fn test_cancel_current_build() {
        let scripted = Arc::new(ScriptedGateway::new(chain()));
        scripted.hold("2");
        let controller = AncestryController::new(scripted.clone(), TraversalConfig::default());

        let generation = controller.request_build(PersonId::new("1"), None).await;
        scripted.wait_for_waiting(1).await;

        assert_eq!(controller.cancel_current_build().await, Some(generation));
        assert_eq!(
            controller.session().state(),
            SessionState::Cancelled(generation)
        );
    }

    #[tokio::test]
    async fn test_request_add_parent() {
        let gateway = chain();
        gateway.insert(PersonRecord::new("10", "New", "Parent")).await;
        let controller = AncestryController::new(Arc::new(gateway), TraversalConfig::default());
        controller.build_tree(PersonId::new("5"), None).await.unwrap();

        let outcome = controller
            .request_add_parent(&PersonId::new("5"), &PersonId::new("10"))
            .await
            .unwrap();

        let tree = controller
            .session()
            .wait_for_tree(outcome.rebuild.unwrap())
            .await
            .unwrap();
        assert_eq!(tree.root.child_ids(), vec![&PersonId::new("10")]);
    }
}
