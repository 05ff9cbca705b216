//! Aggregate repository: replays streams into aggregates and persists their
//! uncommitted events.

use std::marker::PhantomData;

use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::store::{EventStore, StoredEvent};

/// Stateless mediator between an [`EventStore`] and aggregates of type `A`.
///
/// The store may be the shared store itself or an open
/// [`Transaction`](crate::transaction::Transaction); in the latter case
/// saved events only become visible when the transaction commits.
pub struct AggregateRepository<'a, A> {
    store: &'a dyn EventStore,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> std::fmt::Debug for AggregateRepository<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateRepository")
            .field("aggregate", &std::any::type_name::<A>())
            .finish_non_exhaustive()
    }
}

impl<'a, A: AggregateRoot> AggregateRepository<'a, A> {
    /// Creates a repository over `store`.
    #[must_use]
    pub fn new(store: &'a dyn EventStore) -> Self {
        Self {
            store,
            _aggregate: PhantomData,
        }
    }

    /// Loads and replays the aggregate `id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the stream is empty, or any
    /// error from loading or decoding the stored events.
    pub async fn get(&self, id: Uuid) -> Result<A, DomainError> {
        let stored_events = self.store.load_events(id).await?;
        if stored_events.is_empty() {
            return Err(DomainError::AggregateNotFound(id));
        }
        let events = stored_events
            .iter()
            .map(A::Event::from_stored)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(A::from_history(id, &events))
    }

    /// Appends the aggregate's uncommitted events at the version it was
    /// loaded with, then clears the buffer. Returns the stored events.
    ///
    /// # Errors
    ///
    /// Propagates `DomainError::ConcurrencyConflict` unchanged when another
    /// writer got there first; the uncommitted buffer is left intact.
    pub async fn save(&self, aggregate: &mut A) -> Result<Vec<StoredEvent>, DomainError> {
        let stored_events: Vec<StoredEvent> = aggregate
            .uncommitted_events()
            .iter()
            .map(DomainEvent::to_stored)
            .collect();
        if stored_events.is_empty() {
            return Ok(stored_events);
        }

        let aggregate_id = aggregate.aggregate_id();
        let expected_version = aggregate.committed_version();
        self.store
            .append_events(aggregate_id, expected_version, &stored_events)
            .await?;

        tracing::debug!(
            %aggregate_id,
            expected_version,
            appended = stored_events.len(),
            "saved aggregate"
        );
        aggregate.clear_uncommitted_events();
        Ok(stored_events)
    }
}
