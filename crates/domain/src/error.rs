//! Domain error types.

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::user::UserError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The user aggregate rejected a command.
    #[error("User error: {0}")]
    User(#[from] UserError),

    /// No events exist for the requested aggregate.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// Registration collided with an existing username.
    #[error("Username already taken: {username}")]
    DuplicateUsername { username: String },

    /// Registration collided with an existing aggregate identifier.
    #[error("User already exists: {aggregate_id}")]
    DuplicateIdentifier { aggregate_id: AggregateId },

    /// An aggregate reached `save` with uncommitted events but no identity.
    #[error("Aggregate has uncommitted events but no identifier: {aggregate_type}")]
    MissingAggregateId { aggregate_type: &'static str },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// True when the underlying failure is an expected-version mismatch.
    ///
    /// Callers use this to decide whether re-running a command is safe; the
    /// repository itself never retries.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. })
        )
    }
}
