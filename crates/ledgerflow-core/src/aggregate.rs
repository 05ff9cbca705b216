//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots that reconstitute from event history.
///
/// State changes only inside [`AggregateRoot::apply`]. Business methods
/// call [`AggregateRoot::record`], which applies the event right away and
/// queues it for persistence, so any check after a `record` call sees the
/// post-event state.
pub trait AggregateRoot: Send + Sync + Sized {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns a blank aggregate with no history applied.
    fn empty(id: Uuid) -> Self;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied, including
    /// uncommitted ones).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state. Must bump the version by one.
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Queues an already applied event for persistence.
    fn push_uncommitted(&mut self, event: Self::Event);

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Rebuilds an aggregate by applying `events` in order. The uncommitted
    /// buffer stays empty.
    fn from_history(id: Uuid, events: &[Self::Event]) -> Self {
        let mut aggregate = Self::empty(id);
        for event in events {
            aggregate.apply(event);
        }
        aggregate
    }

    /// Applies `event` and appends it to the uncommitted buffer.
    fn record(&mut self, event: Self::Event) {
        self.apply(&event);
        self.push_uncommitted(event);
    }

    /// Version of the last persisted event.
    #[allow(clippy::cast_possible_wrap)]
    fn committed_version(&self) -> i64 {
        self.version() - self.uncommitted_events().len() as i64
    }

    /// Sequence number the next recorded event must carry.
    fn next_sequence_number(&self) -> i64 {
        self.version() + 1
    }
}
