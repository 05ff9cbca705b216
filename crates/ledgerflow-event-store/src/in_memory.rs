//! In-process event store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use ledgerflow_core::error::DomainError;
use ledgerflow_core::store::{EventStore, StoredEvent, ensure_contiguous};

type Streams = HashMap<Uuid, Vec<StoredEvent>>;

/// Event store that keeps every stream in memory. The version check and the
/// insert run under one write lock, so appends to a stream serialize.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<Streams>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams with at least one event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn stream_count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Streams>, DomainError> {
        self.streams
            .read()
            .map_err(|_| DomainError::Infrastructure("event store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Streams>, DomainError> {
        self.streams
            .write()
            .map_err(|_| DomainError::Infrastructure("event store lock poisoned".into()))
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .read()?
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        ensure_contiguous(aggregate_id, expected_version, events)?;

        let mut streams = self.write()?;
        let actual = streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map_or(0, |event| event.sequence_number);
        if actual != expected_version {
            tracing::debug!(
                %aggregate_id,
                expected = expected_version,
                actual,
                "append rejected"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        streams
            .entry(aggregate_id)
            .or_default()
            .extend_from_slice(events);
        tracing::trace!(%aggregate_id, appended = events.len(), "events appended");
        Ok(())
    }

    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        Ok(self
            .read()?
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map_or(0, |event| event.sequence_number))
    }
}
