//! In-memory record gateway using HashMap and petgraph.
//!
//! Records are held in RAM and lost when the process exits. The CLI loads
//! them from a JSONL file (see [`super::jsonl`]) and tests build them inline.
//!
//! # Graph Representation
//!
//! The parent relation is mirrored in a `DiGraph` with edges directed from
//! **child to parent**. The graph only links people that both have records;
//! a parent reference to a missing record stays on the record (the traversal
//! reports it as an unresolved branch) but has no edge.
//!
//! The graph is only used to validate edits. Parent order for traversal
//! always comes from the record's `parents` list, which keeps source order.
//!
//! # Edit Rules
//!
//! [`add_parent_edge`](PersonRecordGateway::add_parent_edge) refuses:
//! - unknown child or parent IDs
//! - a person as their own parent
//! - a child that already has `max_parents` parents
//! - with `reject_cycles`, an edge that makes a person their own ancestor
//!
//! Linking an existing parent again is accepted and changes nothing.

use super::PersonRecordGateway;
use crate::config::GatewayConfig;
use crate::domain::{ParentRef, PersonId, PersonRecord};
use crate::error::GatewayError;
use async_trait::async_trait;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Record map plus parent graph (not thread-safe).
struct GatewayInner {
    records: HashMap<PersonId, PersonRecord>,

    /// Edge direction: child -> parent.
    graph: DiGraph<PersonId, ()>,

    node_map: HashMap<PersonId, NodeIndex>,

    config: GatewayConfig,
}

impl GatewayInner {
    fn new(config: GatewayConfig) -> Self {
        Self {
            records: HashMap::new(),
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            config,
        }
    }

    fn node_for(&mut self, id: &PersonId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(id) {
            return node;
        }
        let node = self.graph.add_node(id.clone());
        self.node_map.insert(id.clone(), node);
        node
    }

    /// Load many records, linking the graph in one pass afterwards.
    ///
    /// Later records replace earlier ones with the same ID.
    fn bulk_load(&mut self, records: impl IntoIterator<Item = PersonRecord>) {
        for record in records {
            self.node_for(&record.id);
            self.records.insert(record.id.clone(), record);
        }

        let node_map = &self.node_map;
        let edges: Vec<(NodeIndex, NodeIndex)> = self
            .records
            .values()
            .flat_map(|record| {
                let child = node_map[&record.id];
                record
                    .parents
                    .iter()
                    .filter_map(move |parent| node_map.get(&parent.id))
                    .map(move |&parent| (child, parent))
            })
            .collect();
        for (child, parent) in edges {
            self.graph.add_edge(child, parent, ());
        }
    }

    /// Insert or replace a record and relink its graph edges.
    fn upsert(&mut self, record: PersonRecord) {
        let id = record.id.clone();
        let node = self.node_for(&id);

        // Drop outgoing edges from a previous version of this record
        while let Some(edge) = self.graph.first_edge(node, petgraph::Direction::Outgoing) {
            self.graph.remove_edge(edge);
        }

        for parent in &record.parents {
            if let Some(&parent_node) = self.node_map.get(&parent.id) {
                self.graph.add_edge(node, parent_node, ());
            }
        }

        // Records loaded earlier may already name this person as a parent
        let children: Vec<NodeIndex> = self
            .records
            .values()
            .filter(|r| r.id != id && r.has_parent(&id))
            .filter_map(|r| self.node_map.get(&r.id).copied())
            .collect();
        for child in children {
            if !self.graph.contains_edge(child, node) {
                self.graph.add_edge(child, node, ());
            }
        }

        self.records.insert(id, record);
    }

    fn add_parent(&mut self, child: &PersonId, parent: &PersonId) -> Result<(), GatewayError> {
        if !self.records.contains_key(child) {
            return Err(GatewayError::PersonNotFound(child.clone()));
        }
        let parent_name = self
            .records
            .get(parent)
            .map(PersonRecord::display_name)
            .ok_or_else(|| GatewayError::PersonNotFound(parent.clone()))?;

        if child == parent {
            return Err(GatewayError::Rejected(format!(
                "{} cannot be their own parent",
                child
            )));
        }

        let child_record = &self.records[child];
        if child_record.has_parent(parent) {
            tracing::debug!(%child, %parent, "Parent already linked");
            return Ok(());
        }

        if let Some(max) = self.config.max_parents {
            if child_record.parents.len() >= max {
                return Err(GatewayError::Rejected(format!(
                    "{} already has {} parents",
                    child,
                    child_record.parents.len()
                )));
            }
        }

        let child_node = self.node_map[child];
        let parent_node = self.node_map[parent];

        // A path parent -> ... -> child means the child is already an ancestor of the parent
        if self.config.reject_cycles
            && algo::has_path_connecting(&self.graph, parent_node, child_node, None)
        {
            return Err(GatewayError::Rejected(format!(
                "{} is already an ancestor of {}",
                child, parent
            )));
        }

        if let Some(record) = self.records.get_mut(child) {
            record
                .parents
                .push(ParentRef::new(parent.clone(), Some(parent_name)));
        }
        self.graph.add_edge(child_node, parent_node, ());

        Ok(())
    }
}

/// Thread-safe in-memory gateway.
///
/// Cloning is cheap and clones share the same records, so a test can keep a
/// handle while a session owns another.
#[derive(Clone)]
pub struct InMemoryGateway {
    inner: Arc<RwLock<GatewayInner>>,
    fetch_counts: Arc<Mutex<HashMap<PersonId, usize>>>,
}

impl InMemoryGateway {
    /// Create an empty gateway.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(GatewayInner::new(config))),
            fetch_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a gateway holding `records`.
    ///
    /// Later records replace earlier ones with the same ID.
    pub fn with_records(records: impl IntoIterator<Item = PersonRecord>, config: GatewayConfig) -> Self {
        let mut inner = GatewayInner::new(config);
        inner.bulk_load(records);
        Self {
            inner: Arc::new(RwLock::new(inner)),
            fetch_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: PersonRecord) {
        self.inner.write().await.upsert(record);
    }

    /// All records, ordered by ID.
    pub async fn records(&self) -> Vec<PersonRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<PersonRecord> = inner.records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether the gateway holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// How many times `id` has been fetched.
    pub async fn fetch_count(&self, id: &PersonId) -> usize {
        self.fetch_counts.lock().await.get(id).copied().unwrap_or(0)
    }

    /// Total fetches across all IDs.
    pub async fn total_fetches(&self) -> usize {
        self.fetch_counts.lock().await.values().sum()
    }

    /// Forget recorded fetch counts.
    pub async fn reset_fetch_counts(&self) {
        self.fetch_counts.lock().await.clear();
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}

#[async_trait]
impl PersonRecordGateway for InMemoryGateway {
    async fn fetch_person(&self, id: &PersonId) -> Result<Option<PersonRecord>, GatewayError> {
        *self.fetch_counts.lock().await.entry(id.clone()).or_insert(0) += 1;
        let inner = self.inner.read().await;
        Ok(inner.records.get(id).cloned())
    }

    async fn add_parent_edge(
        &self,
        child: &PersonId,
        parent: &PersonId,
    ) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().await;
        inner.add_parent(child, parent)?;
        tracing::debug!(%child, %parent, "Added parent edge");
        Ok(())
    }
}
