//! Access to person records.
//!
//! The tree engine never talks to a data source directly. It consumes a
//! [`PersonRecordGateway`], owned by the surrounding application and shared
//! across builds and mutations as `Arc<dyn PersonRecordGateway>`.
//!
//! Implementations provided here:
//!
//! - [`InMemoryGateway`]: records held in a map, with the parent relation
//!   mirrored in a petgraph `DiGraph` for edit validation
//! - [`jsonl`]: loading and saving record files in JSON Lines format
//! - `ScriptedGateway` (with the `test-util` feature): holds chosen fetches
//!   open and injects failures, for exercising build sessions
//!
//! # Thread Safety
//!
//! Gateways must be `Send + Sync`. Reads from several builds may be in flight
//! at once, and an edit may arrive while a build is still fetching.

use crate::domain::{PersonId, PersonRecord};
use crate::error::GatewayError;
use async_trait::async_trait;

pub mod in_memory;
pub mod jsonl;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use in_memory::InMemoryGateway;

/// Source of person records and relationship edits.
#[async_trait]
pub trait PersonRecordGateway: Send + Sync {
    /// Fetch one person record.
    ///
    /// Returns `Ok(None)` when the source has no record for `id`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` when the source cannot answer.
    async fn fetch_person(&self, id: &PersonId) -> Result<Option<PersonRecord>, GatewayError>;

    /// Record `parent` as a parent of `child`.
    ///
    /// Linking a parent that is already linked succeeds without change.
    ///
    /// # Errors
    ///
    /// - `GatewayError::PersonNotFound` if either person doesn't exist
    /// - `GatewayError::Rejected` if the source refuses the edit
    async fn add_parent_edge(
        &self,
        child: &PersonId,
        parent: &PersonId,
    ) -> Result<(), GatewayError>;
}
