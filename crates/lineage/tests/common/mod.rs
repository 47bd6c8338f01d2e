//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lineage::config::GatewayConfig;
use lineage::domain::{ParentRef, PersonId, PersonRecord};
use lineage::error::GatewayError;
use lineage::gateway::{InMemoryGateway, PersonRecordGateway};
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::watch;

/// A record with the given parents, named after its ID.
pub fn person(id: &str, parents: &[&str]) -> PersonRecord {
    let mut record = PersonRecord::new(id, &format!("Person{}", id), "Test");
    record.parents = parents.iter().map(|p| ParentRef::new(*p, None)).collect();
    record
}

/// An in-memory gateway over `(id, parents)` pairs, with no parent limit.
pub fn family(people: &[(&str, &[&str])]) -> InMemoryGateway {
    InMemoryGateway::with_records(
        people.iter().map(|(id, parents)| person(id, parents)),
        GatewayConfig {
            max_parents: None,
            ..GatewayConfig::default()
        },
    )
}

/// Gateway whose fetches for gated IDs stay pending until opened.
pub struct GatedGateway {
    inner: InMemoryGateway,
    gates: watch::Sender<HashSet<PersonId>>,
    seen: Mutex<Vec<PersonId>>,
}

impl GatedGateway {
    pub fn new(inner: InMemoryGateway, gated: &[&str]) -> Self {
        Self {
            inner,
            gates: watch::Sender::new(gated.iter().map(|id| PersonId::new(*id)).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Let every pending fetch complete.
    pub fn open_all(&self) {
        self.gates.send_modify(HashSet::clear);
    }

    /// IDs requested so far, in request order.
    pub fn seen(&self) -> Vec<PersonId> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersonRecordGateway for GatedGateway {
    async fn fetch_person(&self, id: &PersonId) -> Result<Option<PersonRecord>, GatewayError> {
        self.seen.lock().unwrap().push(id.clone());
        let mut gates = self.gates.subscribe();
        let _ = gates.wait_for(|gated| !gated.contains(id)).await;
        self.inner.fetch_person(id).await
    }

    async fn add_parent_edge(
        &self,
        child: &PersonId,
        parent: &PersonId,
    ) -> Result<(), GatewayError> {
        self.inner.add_parent_edge(child, parent).await
    }
}
