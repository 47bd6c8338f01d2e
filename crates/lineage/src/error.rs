//! Error types for lineage operations.
//!
//! Build and mutation failures have their own enums so they can be handed to
//! observers verbatim. Branch-level problems during a build are not errors;
//! they are reported as [`Diagnostic`](crate::traversal::Diagnostic)s on the
//! finished tree.

use crate::domain::PersonId;
use crate::session::Generation;
use std::io;
use thiserror::Error;

/// The error type for lineage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A person record failed validation at the gateway boundary.
    #[error("Invalid person record: {0}")]
    InvalidRecord(String),
}

/// Errors that fail a tree build as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The root person has no record.
    #[error("Root person not found: {0}")]
    RootNotFound(PersonId),

    /// The root record could not be fetched.
    #[error("Root person {id} could not be fetched: {reason}")]
    RootUnavailable {
        /// The root person ID.
        id: PersonId,
        /// Gateway failure description.
        reason: String,
    },

    /// The generation was replaced or cancelled before it finished.
    ///
    /// Only returned to callers waiting on a specific generation; observers
    /// never receive it.
    #[error("Build generation {0} was superseded")]
    Superseded(Generation),
}

/// Errors returned by relationship edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The edit would make a person their own parent.
    #[error("Person {0} cannot be their own parent")]
    SelfReference(PersonId),

    /// The gateway refused the edit.
    #[error("Cannot add {parent} as parent of {child}: {reason}")]
    Rejected {
        /// The child person ID.
        child: PersonId,
        /// The proposed parent ID.
        parent: PersonId,
        /// Why the gateway refused.
        reason: String,
    },
}

/// Errors reported by a [`PersonRecordGateway`](crate::gateway::PersonRecordGateway).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A person referenced by an edit does not exist.
    #[error("Person not found: {0}")]
    PersonNotFound(PersonId),

    /// The gateway refused an edit.
    #[error("{0}")]
    Rejected(String),

    /// The data source could not be reached or answered with an error.
    #[error("Record source unavailable: {0}")]
    Unavailable(String),
}

/// A specialized Result type for lineage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_errors_convert() {
        let io_error: Error = io::Error::new(io::ErrorKind::NotFound, "people.jsonl").into();
        assert!(matches!(io_error, Error::Io(_)));

        let json_error: Error = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(json_error.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_build_error_names_root() {
        let error = BuildError::RootNotFound(PersonId::new("404"));
        assert_eq!(error.to_string(), "Root person not found: 404");
    }
}
