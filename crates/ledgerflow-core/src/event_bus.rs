//! Event bus: delivers committed events to subscribers registered per
//! event type.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::store::StoredEvent;

/// Receives the events of each committed transaction.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `events`, in commit order. Runs after the commit, so it has
    /// no way to undo it.
    async fn publish(&self, events: &[StoredEvent]);
}

/// Reacts to one committed event.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handles a committed event. An error is logged by the bus and does not
    /// stop delivery to other subscribers.
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError>;

    /// The name of the subscriber, used in tracing spans.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Dispatch table from event type to subscribers, in registration order.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<String, Vec<Arc<dyn EventSubscriber>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(&String, usize)> = self
            .subscribers
            .iter()
            .map(|(event_type, subscribers)| (event_type, subscribers.len()))
            .collect();
        counts.sort();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .finish()
    }
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscriber` for events of `event_type`.
    pub fn subscribe(
        &mut self,
        event_type: impl Into<String>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> &mut Self {
        self.subscribers
            .entry(event_type.into())
            .or_default()
            .push(subscriber);
        self
    }

    /// Number of subscribers registered for `event_type`.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscribers.get(event_type).map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, events: &[StoredEvent]) {
        for event in events {
            let Some(subscribers) = self.subscribers.get(&event.event_type) else {
                tracing::trace!(event_type = %event.event_type, "no subscribers");
                continue;
            };
            for subscriber in subscribers {
                if let Err(error) = subscriber.handle(event).await {
                    tracing::error!(
                        event_id = %event.event_id,
                        aggregate_id = %event.aggregate_id,
                        event_type = %event.event_type,
                        subscriber = subscriber.name(),
                        error = %error,
                        "event subscriber failed to handle event"
                    );
                }
            }
        }
    }
}

/// Subscriber that decodes the stored event into `E` before handing it to
/// a closure.
pub struct TypedSubscriber<E, F> {
    name: &'static str,
    handler: F,
    _event: PhantomData<fn(E)>,
}

impl<E, F> TypedSubscriber<E, F>
where
    E: DomainEvent,
    F: Fn(&E) -> Result<(), DomainError> + Send + Sync,
{
    /// Wraps `handler` under `name`.
    pub fn new(name: &'static str, handler: F) -> Self {
        Self {
            name,
            handler,
            _event: PhantomData,
        }
    }
}

#[async_trait]
impl<E, F> EventSubscriber for TypedSubscriber<E, F>
where
    E: DomainEvent,
    F: Fn(&E) -> Result<(), DomainError> + Send + Sync,
{
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let decoded = E::from_stored(event)?;
        (self.handler)(&decoded)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
