//! Event store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Append-only, per-stream ordered event log with optimistic concurrency.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load all events for a given aggregate, ordered by sequence number.
    /// A stream that does not exist yields an empty vector.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    /// `expected_version` is the last known sequence number; either every
    /// event is persisted or none is.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` when the stream's current
    /// version differs from `expected_version`.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Current version of the stream, `0` when it does not exist.
    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        let events = self.load_events(aggregate_id).await?;
        Ok(events.last().map_or(0, |event| event.sequence_number))
    }
}

/// Checks that `events` continue the stream `aggregate_id` right after
/// `expected_version`, without gaps.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` describing the first offending
/// event.
pub fn ensure_contiguous(
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    for (expected_sequence, event) in (expected_version + 1..).zip(events) {
        if event.aggregate_id != aggregate_id {
            return Err(DomainError::Infrastructure(format!(
                "event {} belongs to aggregate {}, not {aggregate_id}",
                event.event_id, event.aggregate_id
            )));
        }
        if event.sequence_number != expected_sequence {
            return Err(DomainError::Infrastructure(format!(
                "event {} has sequence number {}, expected {expected_sequence}",
                event.event_id, event.sequence_number
            )));
        }
    }
    Ok(())
}
