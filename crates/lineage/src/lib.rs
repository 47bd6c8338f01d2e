//! Lineage - ancestor tree construction over a genealogy record source.
//!
//! Given a root person, the engine follows parent links upward for a bounded
//! number of generations, fetching each person through a
//! [`PersonRecordGateway`](gateway::PersonRecordGateway) at most once per
//! build. Cyclic parent data is cut off per branch instead of looping, and
//! the result is a render-ready [`DisplayTree`](display::DisplayTree).
//!
//! Builds run in a [`BuildSession`](session::BuildSession), where selecting a
//! new root supersedes the build in progress. Parent edits go through the
//! [`MutationCoordinator`](mutation::MutationCoordinator), which rebuilds the
//! current tree once the edit is accepted.

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod controller;
pub mod display;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod mutation;
pub mod session;
pub mod traversal;

// CLI and terminal output (needed by binary)
pub mod cli;
pub mod output;

pub use controller::AncestryController;
pub use error::{Error, Result};
