//! Domain error types.

use std::error::Error as StdError;

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No stream exists for the requested aggregate.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A business rule rejected the operation. The concrete rule error is
    /// kept as the source so callers can inspect it with
    /// [`DomainError::rejection`].
    #[error("rejected: {0}")]
    Rejected(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stored event carries a type this aggregate does not know.
    #[error("unknown event type {event_type} for aggregate {aggregate_id}")]
    UnknownEventType {
        /// The aggregate the event belongs to.
        aggregate_id: Uuid,
        /// The unrecognized discriminant.
        event_type: String,
    },

    /// A transaction already bound to one aggregate was asked to write to
    /// another.
    #[error("transaction is bound to aggregate {bound}, cannot append to {attempted}")]
    TransactionScope {
        /// The aggregate the transaction is bound to.
        bound: Uuid,
        /// The aggregate the rejected append targeted.
        attempted: Uuid,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Wraps a business-rule error.
    pub fn rejected<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Rejected(Box::new(err))
    }

    /// Returns the wrapped business-rule error if it is of type `E`.
    #[must_use]
    pub fn rejection<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Rejected(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns `true` for an optimistic concurrency conflict.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Infrastructure(format!("event serialization failed: {err}"))
    }
}
