//! Build sessions with generation tokens.
//!
//! A [`BuildSession`] runs at most one tree build that can still publish a
//! result. Every [`start`](BuildSession::start) opens a new [`Generation`];
//! the build of any earlier generation is aborted, and should it still
//! finish, its result is discarded because its token no longer matches.
//!
//! # State
//!
//! The session publishes its [`SessionState`] on a `tokio::sync::watch`
//! channel. Applying a result, changing state, and notifying the
//! [`BuildObserver`] happen together under the session lock, so a consumer
//! never sees a result from a generation that has been superseded.
//!
//! Dropping the last handle to a session aborts its build in progress. The
//! build task only holds a weak reference, so a result that finishes after
//! teardown is never applied.
//!
//! # Example
//!
//! ```no_run
//! # use lineage::config::TraversalConfig;
//! # use lineage::gateway::InMemoryGateway;
//! # use lineage::session::BuildSession;
//! # use std::sync::Arc;
//! # async fn demo() -> Result<(), lineage::error::BuildError> {
//! let session = BuildSession::new(Arc::new(InMemoryGateway::default()), TraversalConfig::default());
//! let generation = session.start("7".into()).await;
//! let tree = session.wait_for_tree(generation).await?;
//! println!("{} people", tree.root.node_count());
//! # Ok(())
//! # }
//! ```

use crate::cache::PersonCache;
use crate::config::TraversalConfig;
use crate::display::DisplayTree;
use crate::domain::PersonId;
use crate::error::BuildError;
use crate::gateway::PersonRecordGateway;
use crate::traversal::TraversalEngine;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Monotonically increasing build token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(pub u64);

impl Generation {
    /// The token after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root and depth of a requested build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Root person
    pub root: PersonId,
    /// Generations above the root
    pub max_depth: usize,
}

/// Observable state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing started yet.
    Idle,

    /// The generation's build is in progress.
    Running(Generation),

    /// The generation finished with a tree.
    Succeeded(Generation, Arc<DisplayTree>),

    /// The generation failed as a whole.
    Failed(Generation, BuildError),

    /// The generation was cancelled before finishing.
    Cancelled(Generation),
}

impl SessionState {
    /// Generation this state belongs to, if any.
    pub fn generation(&self) -> Option<Generation> {
        match self {
            SessionState::Idle => None,
            SessionState::Running(g)
            | SessionState::Succeeded(g, _)
            | SessionState::Failed(g, _)
            | SessionState::Cancelled(g) => Some(*g),
        }
    }

    /// Whether a build is in progress.
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running(_))
    }

    /// The finished tree, if the latest build succeeded.
    pub fn tree(&self) -> Option<&Arc<DisplayTree>> {
        match self {
            SessionState::Succeeded(_, tree) => Some(tree),
            _ => None,
        }
    }
}

/// Receives build lifecycle notifications.
///
/// Callbacks run while the session lock is held and must not block. They
/// are only made for the current generation; superseded or cancelled builds
/// never produce a success or failure callback.
pub trait BuildObserver: Send + Sync {
    /// A new generation started building from `root`.
    fn on_build_started(&self, generation: Generation, root: &PersonId) {
        let _ = (generation, root);
    }

    /// The generation produced a tree.
    fn on_build_succeeded(&self, generation: Generation, tree: &DisplayTree) {
        let _ = (generation, tree);
    }

    /// The generation failed as a whole.
    fn on_build_failed(&self, generation: Generation, error: &BuildError) {
        let _ = (generation, error);
    }
}

struct Current {
    generation: Generation,
    request: Option<BuildRequest>,
    task: Option<JoinHandle<()>>,
}

struct SessionInner {
    gateway: Arc<dyn PersonRecordGateway>,
    config: TraversalConfig,
    observer: Option<Arc<dyn BuildObserver>>,
    current: Mutex<Current>,
    state: watch::Sender<SessionState>,
}

/// Runs tree builds, one live generation at a time.
///
/// Cloning a session yields another handle to the same session.
#[derive(Clone)]
pub struct BuildSession {
    inner: Arc<SessionInner>,
}

impl BuildSession {
    /// Create a session reading through `gateway`.
    pub fn new(gateway: Arc<dyn PersonRecordGateway>, config: TraversalConfig) -> Self {
        Self::build(gateway, config, None)
    }

    /// Create a session that reports to `observer`.
    pub fn with_observer(
        gateway: Arc<dyn PersonRecordGateway>,
        config: TraversalConfig,
        observer: Arc<dyn BuildObserver>,
    ) -> Self {
        Self::build(gateway, config, Some(observer))
    }

    fn build(
        gateway: Arc<dyn PersonRecordGateway>,
        config: TraversalConfig,
        observer: Option<Arc<dyn BuildObserver>>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                config,
                observer,
                current: Mutex::new(Current {
                    generation: Generation::default(),
                    request: None,
                    task: None,
                }),
                state: watch::Sender::new(SessionState::Idle),
            }),
        }
    }

    /// Traversal settings of this session.
    pub fn config(&self) -> &TraversalConfig {
        &self.inner.config
    }

    /// Start building from `root` at the configured depth.
    pub async fn start(&self, root: PersonId) -> Generation {
        let max_depth = self.inner.config.max_depth;
        self.start_with_depth(root, max_depth).await
    }

    /// Start building from `root`, `max_depth` generations up.
    ///
    /// Supersedes any build still in progress.
    pub async fn start_with_depth(&self, root: PersonId, max_depth: usize) -> Generation {
        let mut current = self.inner.current.lock().await;

        let generation = current.generation.next();
        current.generation = generation;
        if let Some(task) = current.task.take() {
            task.abort();
        }

        let request = BuildRequest { root, max_depth };
        current.request = Some(request.clone());

        self.inner.state.send_replace(SessionState::Running(generation));
        tracing::info!(%generation, root = %request.root, max_depth, "Build started");
        if let Some(observer) = &self.inner.observer {
            observer.on_build_started(generation, &request.root);
        }

        let task = BuildTask {
            session: Arc::downgrade(&self.inner),
            gateway: Arc::clone(&self.inner.gateway),
            config: self.inner.config.clone(),
            generation,
            request,
        };
        current.task = Some(tokio::spawn(task.run()));

        generation
    }

    /// Cancel the build in progress.
    ///
    /// Returns the cancelled generation, or `None` if nothing was running.
    pub async fn cancel(&self) -> Option<Generation> {
        let mut current = self.inner.current.lock().await;

        let running = match *self.inner.state.borrow() {
            SessionState::Running(generation) => Some(generation),
            _ => None,
        };
        let generation = running?;

        if let Some(task) = current.task.take() {
            task.abort();
        }
        self.inner.state.send_replace(SessionState::Cancelled(generation));
        tracing::info!(%generation, "Build cancelled");

        Some(generation)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Root and depth of the latest start, if any.
    pub async fn current_request(&self) -> Option<BuildRequest> {
        self.inner.current.lock().await.request.clone()
    }

    /// Wait until `generation` is no longer running, and return the state at
    /// that point.
    pub async fn wait(&self, generation: Generation) -> SessionState {
        let mut rx = self.inner.state.subscribe();
        let settled = rx
            .wait_for(|state| !matches!(state, SessionState::Running(g) if *g == generation))
            .await
            .map(|state| state.clone());

        // The sender lives as long as self, so the channel cannot be closed
        settled.unwrap_or_else(|_| self.state())
    }

    /// Wait for the tree of `generation`.
    ///
    /// # Errors
    ///
    /// - The build's own error if the generation failed
    /// - `BuildError::Superseded` if the generation was replaced or cancelled
    pub async fn wait_for_tree(&self, generation: Generation) -> Result<Arc<DisplayTree>, BuildError> {
        match self.wait(generation).await {
            SessionState::Succeeded(g, tree) if g == generation => Ok(tree),
            SessionState::Failed(g, error) if g == generation => Err(error),
            _ => Err(BuildError::Superseded(generation)),
        }
    }
}

/// Everything a spawned build needs, without keeping its session alive.
struct BuildTask {
    session: Weak<SessionInner>,
    gateway: Arc<dyn PersonRecordGateway>,
    config: TraversalConfig,
    generation: Generation,
    request: BuildRequest,
}

impl BuildTask {
    async fn run(self) {
        let cache = Arc::new(PersonCache::new(
            self.gateway,
            self.config.max_concurrent_fetches,
        ));
        let engine = TraversalEngine::new(cache);
        let result = engine.build(&self.request.root, self.request.max_depth).await;

        match self.session.upgrade() {
            Some(session) => session.apply(self.generation, result).await,
            None => {
                tracing::debug!(generation = %self.generation, "Discarded result of torn down session");
            }
        }
    }
}

impl SessionInner {
    async fn apply(&self, generation: Generation, result: Result<DisplayTree, BuildError>) {
        let current = self.current.lock().await;

        let live = current.generation == generation
            && matches!(*self.state.borrow(), SessionState::Running(g) if g == generation);
        if !live {
            tracing::debug!(%generation, "Discarded result of superseded build");
            return;
        }

        match result {
            Ok(tree) => {
                let tree = Arc::new(tree);
                self.state
                    .send_replace(SessionState::Succeeded(generation, Arc::clone(&tree)));
                tracing::info!(
                    %generation,
                    nodes = tree.root.node_count(),
                    fetches = tree.fetches,
                    "Build succeeded"
                );
                if let Some(observer) = &self.observer {
                    observer.on_build_succeeded(generation, &tree);
                }
            }
            Err(error) => {
                self.state
                    .send_replace(SessionState::Failed(generation, error.clone()));
                tracing::warn!(%generation, %error, "Build failed");
                if let Some(observer) = &self.observer {
                    observer.on_build_failed(generation, &error);
                }
            }
        }

        drop(current);
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(task) = self.current.get_mut().task.take() {
            task.abort();
            tracing::debug!("Session dropped, build aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::domain::{ParentRef, PersonRecord};
    use crate::gateway::InMemoryGateway;
    use crate::gateway::testing::ScriptedGateway;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Started(Generation, PersonId),
        Succeeded(Generation, PersonId),
        Failed(Generation, BuildError),
    }

    #[derive(Default)]
    struct Recorder(StdMutex<Vec<Event>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    impl BuildObserver for Recorder {
        fn on_build_started(&self, generation: Generation, root: &PersonId) {
            self.0
                .lock()
                .unwrap()
                .push(Event::Started(generation, root.clone()));
        }

        fn on_build_succeeded(&self, generation: Generation, tree: &DisplayTree) {
            self.0
                .lock()
                .unwrap()
                .push(Event::Succeeded(generation, tree.root.person_id().clone()));
        }

        fn on_build_failed(&self, generation: Generation, error: &BuildError) {
            self.0
                .lock()
                .unwrap()
                .push(Event::Failed(generation, error.clone()));
        }
    }

    fn family() -> InMemoryGateway {
        let mut child = PersonRecord::new("7", "Ada", "Byron");
        child.parents = vec![ParentRef::new("3", None)];
        InMemoryGateway::with_records(
            vec![child, PersonRecord::new("3", "George", "Byron"), PersonRecord::new("8", "Bea", "")],
            GatewayConfig::default(),
        )
    }

    fn session(gateway: Arc<dyn PersonRecordGateway>) -> (BuildSession, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let session = BuildSession::with_observer(gateway, TraversalConfig::default(), recorder.clone());
        (session, recorder)
    }

    #[tokio::test]
    async fn test_build_succeeds() {
        let (session, recorder) = session(Arc::new(family()));
        assert_eq!(session.state(), SessionState::Idle);

        let generation = session.start(PersonId::new("7")).await;
        let tree = session.wait_for_tree(generation).await.unwrap();

        assert_eq!(generation, Generation(1));
        assert_eq!(tree.root.child_ids(), vec![&PersonId::new("3")]);
        assert_eq!(session.state().tree(), Some(&tree));
        assert_eq!(
            recorder.events(),
            vec![
                Event::Started(generation, PersonId::new("7")),
                Event::Succeeded(generation, PersonId::new("7")),
            ]
        );
    }

    #[tokio::test]
    async fn test_root_not_found_fails_build() {
        let (session, recorder) = session(Arc::new(family()));

        let generation = session.start(PersonId::new("404")).await;
        let result = session.wait_for_tree(generation).await;

        let expected = BuildError::RootNotFound(PersonId::new("404"));
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(session.state(), SessionState::Failed(generation, expected.clone()));
        assert_eq!(recorder.events()[1], Event::Failed(generation, expected));
    }

    #[tokio::test]
    async fn test_newer_start_supersedes() {
        let scripted = Arc::new(ScriptedGateway::new(family()));
        scripted.hold("7");
        let (session, recorder) = session(scripted.clone());

        let first = session.start(PersonId::new("7")).await;
        scripted.wait_for_waiting(1).await;
        let second = session.start(PersonId::new("8")).await;
        scripted.release_all();

        assert_eq!(
            session.wait_for_tree(first).await,
            Err(BuildError::Superseded(first))
        );
        let tree = session.wait_for_tree(second).await.unwrap();
        assert_eq!(tree.root.name, "Bea");

        let events = recorder.events();
        assert!(!events.contains(&Event::Succeeded(first, PersonId::new("7"))));
        assert_eq!(events.last(), Some(&Event::Succeeded(second, PersonId::new("8"))));
    }

    #[tokio::test]
    async fn test_cancel_discards_result() {
        let scripted = Arc::new(ScriptedGateway::new(family()));
        scripted.hold("3");
        let (session, recorder) = session(scripted.clone());

        let generation = session.start(PersonId::new("7")).await;
        scripted.wait_for_waiting(1).await;

        assert_eq!(session.cancel().await, Some(generation));
        scripted.release_all();

        assert_eq!(session.state(), SessionState::Cancelled(generation));
        assert_eq!(
            session.wait_for_tree(generation).await,
            Err(BuildError::Superseded(generation))
        );
        assert_eq!(recorder.events().len(), 1);
        assert_eq!(session.cancel().await, None);
    }

    #[tokio::test]
    async fn test_dropping_session_aborts_build() {
        let scripted = Arc::new(ScriptedGateway::new(family()));
        scripted.hold("7");
        let (session, recorder) = session(scripted.clone());
        let mut rx = session.subscribe();

        let generation = session.start(PersonId::new("7")).await;
        scripted.wait_for_waiting(1).await;
        drop(session);
        scripted.release_all();

        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            recorder.events(),
            vec![Event::Started(generation, PersonId::new("7"))]
        );
        // the state sender went away with the session
        assert!(rx.borrow_and_update().is_running());
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test]
    async fn test_subscribe_sees_transitions() {
        let (session, _) = session(Arc::new(family()));
        let mut rx = session.subscribe();

        let generation = session.start(PersonId::new("7")).await;
        assert!(rx.borrow_and_update().is_running());

        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow(), SessionState::Succeeded(g, _) if g == generation));
    }

    #[tokio::test]
    async fn test_current_request_tracks_latest_start() {
        let (session, _) = session(Arc::new(family()));
        assert_eq!(session.current_request().await, None);

        let generation = session.start_with_depth(PersonId::new("8"), 5).await;
        session.wait(generation).await;

        assert_eq!(
            session.current_request().await,
            Some(BuildRequest {
                root: PersonId::new("8"),
                max_depth: 5,
            })
        );
    }
}
