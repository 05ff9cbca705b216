//! Command bus: routes each command to its single registered handler inside
//! a transaction, and publishes the committed events afterwards.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::Instrument;

use crate::command::Command;
use crate::error::DomainError;
use crate::event_bus::EventPublisher;
use crate::store::EventStore;
use crate::transaction::TransactionManager;

/// Errors surfaced by [`CommandBus`].
#[derive(Debug, Error)]
pub enum CommandBusError {
    /// No handler is registered for the command type.
    #[error("no handler registered for command {0}")]
    Routing(&'static str),

    /// A handler is already registered for the command type.
    #[error("a handler is already registered for command {0}")]
    AlreadyRegistered(&'static str),

    /// The handler (or the commit that followed it) failed; the transaction
    /// was rolled back.
    #[error("dispatch of {command_type} failed: {cause}")]
    Dispatch {
        /// The command that failed.
        command_type: &'static str,
        /// The original error.
        #[source]
        cause: DomainError,
    },
}

impl CommandBusError {
    /// The original handler error, for dispatch failures.
    #[must_use]
    pub fn cause(&self) -> Option<&DomainError> {
        match self {
            Self::Dispatch { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Handles one command type. Implementations load the aggregate through an
/// [`AggregateRepository`](crate::repository::AggregateRepository) built on
/// `store`, call one business method, and save.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Handles `command`, reading and writing through `store`.
    async fn handle(&self, command: C, store: &dyn EventStore) -> Result<(), DomainError>;
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn handle(
        &self,
        command: Box<dyn Any + Send>,
        store: &dyn EventStore,
    ) -> Result<(), DomainError>;
}

struct Routed<C, H> {
    handler: H,
    _command: PhantomData<fn(C)>,
}

#[async_trait]
impl<C, H> ErasedHandler for Routed<C, H>
where
    C: Command,
    H: CommandHandler<C>,
{
    async fn handle(
        &self,
        command: Box<dyn Any + Send>,
        store: &dyn EventStore,
    ) -> Result<(), DomainError> {
        let command = command.downcast::<C>().map_err(|_| {
            DomainError::Infrastructure(format!(
                "command routed to {} has the wrong type",
                C::COMMAND_TYPE
            ))
        })?;
        self.handler.handle(*command, store).await
    }
}

/// Dispatch table from command type to handler.
pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn ErasedHandler>>,
    transactions: TransactionManager,
    publisher: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut routes: Vec<_> = self.handlers.keys().collect();
        routes.sort();
        f.debug_struct("CommandBus")
            .field("routes", &routes)
            .finish_non_exhaustive()
    }
}

impl CommandBus {
    /// Creates a bus with no routes.
    #[must_use]
    pub fn new(transactions: TransactionManager, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            handlers: HashMap::new(),
            transactions,
            publisher,
        }
    }

    /// Routes commands of type `C` to `handler`.
    ///
    /// # Errors
    ///
    /// Returns `CommandBusError::AlreadyRegistered` if `C` already has a
    /// handler.
    pub fn register<C, H>(&mut self, handler: H) -> Result<&mut Self, CommandBusError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        if self.handlers.contains_key(C::COMMAND_TYPE) {
            return Err(CommandBusError::AlreadyRegistered(C::COMMAND_TYPE));
        }
        self.handlers.insert(
            C::COMMAND_TYPE,
            Box::new(Routed {
                handler,
                _command: PhantomData,
            }),
        );
        Ok(self)
    }

    /// Returns `true` if a handler is registered for `command_type`.
    #[must_use]
    pub fn routes(&self, command_type: &str) -> bool {
        self.handlers.contains_key(command_type)
    }

    /// Runs `command` through its handler in a fresh transaction. On success
    /// the transaction commits and the committed events are published; on
    /// failure it rolls back and nothing becomes visible.
    ///
    /// # Errors
    ///
    /// Returns `CommandBusError::Routing` if no handler is registered, or
    /// `CommandBusError::Dispatch` wrapping the handler or commit error.
    pub async fn dispatch<C: Command>(&self, command: C) -> Result<(), CommandBusError> {
        let command_type = C::COMMAND_TYPE;
        let Some(handler) = self.handlers.get(command_type) else {
            tracing::error!(command_type, "no handler registered");
            return Err(CommandBusError::Routing(command_type));
        };

        let span = tracing::info_span!(
            "command_bus.dispatch",
            command_type,
            aggregate_id = %command.aggregate_id(),
            correlation_id = %command.correlation_id()
        );

        async move {
            let transaction = self.transactions.begin();
            let outcome = handler.handle(Box::new(command), &transaction).await;
            if let Err(cause) = outcome {
                tracing::warn!(error = %cause, "command handler failed");
                transaction.rollback();
                return Err(CommandBusError::Dispatch {
                    command_type,
                    cause,
                });
            }

            let committed = transaction.commit().await.map_err(|cause| {
                tracing::warn!(error = %cause, "commit failed");
                CommandBusError::Dispatch {
                    command_type,
                    cause,
                }
            })?;

            tracing::info!(events = committed.len(), "command committed");
            self.publisher.publish(&committed).await;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::aggregate::AggregateRoot;
    use crate::repository::AggregateRepository;
    use crate::store::StoredEvent;
    use crate::testing::{Counter, MemoryStore};

    #[derive(Debug)]
    struct Increment {
        counter_id: Uuid,
        by: i64,
    }

    impl Command for Increment {
        const COMMAND_TYPE: &'static str = "counter.increment";

        fn aggregate_id(&self) -> Uuid {
            self.counter_id
        }

        fn correlation_id(&self) -> Uuid {
            Uuid::nil()
        }
    }

    #[derive(Debug)]
    struct Unrouted;

    impl Command for Unrouted {
        const COMMAND_TYPE: &'static str = "counter.unrouted";

        fn aggregate_id(&self) -> Uuid {
            Uuid::nil()
        }

        fn correlation_id(&self) -> Uuid {
            Uuid::nil()
        }
    }

    /// Loads (or starts) a counter, increments it, saves, and optionally
    /// fails after saving.
    struct IncrementHandler {
        fail_after_save: bool,
    }

    #[async_trait]
    impl CommandHandler<Increment> for IncrementHandler {
        async fn handle(&self, command: Increment, store: &dyn EventStore) -> Result<(), DomainError> {
            let repo = AggregateRepository::<Counter>::new(store);
            let mut counter = match repo.get(command.counter_id).await {
                Ok(counter) => counter,
                Err(DomainError::AggregateNotFound(id)) => Counter::empty(id),
                Err(err) => return Err(err),
            };
            counter.increment(command.by);
            repo.save(&mut counter).await?;
            if self.fail_after_save {
                return Err(DomainError::Validation("handler failed after save".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        batches: Mutex<Vec<Vec<StoredEvent>>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, events: &[StoredEvent]) {
            self.batches.lock().unwrap().push(events.to_vec());
        }
    }

    /// Reads the shared store while being published to.
    struct StoreObservingPublisher {
        store: Arc<MemoryStore>,
        seen: Mutex<Vec<(Vec<StoredEvent>, Vec<StoredEvent>)>>,
    }

    #[async_trait]
    impl EventPublisher for StoreObservingPublisher {
        async fn publish(&self, events: &[StoredEvent]) {
            let mut visible = Vec::new();
            for event in events {
                if !visible.iter().any(|v: &StoredEvent| v.aggregate_id == event.aggregate_id) {
                    visible.extend(self.store.load_events(event.aggregate_id).await.unwrap());
                }
            }
            self.seen.lock().unwrap().push((events.to_vec(), visible));
        }
    }

    fn bus(fail_after_save: bool) -> (Arc<MemoryStore>, Arc<RecordingPublisher>, CommandBus) {
        let store = Arc::new(MemoryStore::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let mut bus = CommandBus::new(TransactionManager::new(store.clone()), publisher.clone());
        bus.register::<Increment, _>(IncrementHandler { fail_after_save })
            .unwrap();
        (store, publisher, bus)
    }

    #[tokio::test]
    async fn test_dispatch_commits_and_publishes() {
        // Arrange
        let (store, publisher, bus) = bus(false);
        let counter_id = Uuid::new_v4();

        // Act
        bus.dispatch(Increment { counter_id, by: 3 }).await.unwrap();

        // Assert
        let stored = store.load_events(counter_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        let batches = publisher.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], stored);
    }

    #[tokio::test]
    async fn test_published_events_are_already_committed() {
        // Arrange
        let store = Arc::new(MemoryStore::default());
        let publisher = Arc::new(StoreObservingPublisher {
            store: Arc::clone(&store),
            seen: Mutex::new(Vec::new()),
        });
        let mut bus = CommandBus::new(TransactionManager::new(store.clone()), publisher.clone());
        bus.register::<Increment, _>(IncrementHandler {
            fail_after_save: false,
        })
        .unwrap();
        let counter_id = Uuid::new_v4();

        // Act
        bus.dispatch(Increment { counter_id, by: 1 }).await.unwrap();
        bus.dispatch(Increment { counter_id, by: 2 }).await.unwrap();

        // Assert
        let seen = publisher.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for (published, visible) in seen.iter() {
            for event in published {
                assert!(
                    visible.contains(event),
                    "event {} was published before it was committed",
                    event.sequence_number
                );
            }
        }
        assert_eq!(seen[1].1.len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_rolls_back_when_handler_fails_after_save() {
        // Arrange
        let (store, publisher, bus) = bus(true);
        let counter_id = Uuid::new_v4();

        // Act
        let result = bus.dispatch(Increment { counter_id, by: 3 }).await;

        // Assert
        match result {
            Err(CommandBusError::Dispatch {
                command_type,
                cause: DomainError::Validation(msg),
            }) => {
                assert_eq!(command_type, "counter.increment");
                assert_eq!(msg, "handler failed after save");
            }
            other => panic!("expected Dispatch(Validation), got {other:?}"),
        }
        assert!(store.load_events(counter_id).await.unwrap().is_empty());
        assert!(publisher.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_without_handler_is_routing_error() {
        let (_store, _publisher, bus) = bus(false);

        let result = bus.dispatch(Unrouted).await;

        assert!(matches!(result, Err(CommandBusError::Routing("counter.unrouted"))));
        assert!(!bus.routes("counter.unrouted"));
        assert!(bus.routes("counter.increment"));
    }

    #[tokio::test]
    async fn test_register_rejects_second_handler_for_same_command() {
        let (_store, _publisher, mut bus) = bus(false);

        let result = bus.register::<Increment, _>(IncrementHandler {
            fail_after_save: false,
        });

        assert!(matches!(
            result,
            Err(CommandBusError::AlreadyRegistered("counter.increment"))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_error_exposes_cause_as_source() {
        let (_store, _publisher, bus) = bus(true);

        let err = bus
            .dispatch(Increment {
                counter_id: Uuid::new_v4(),
                by: 1,
            })
            .await
            .unwrap_err();

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "validation error: handler failed after save");
        assert!(matches!(err.cause(), Some(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_sequential_dispatches_extend_the_stream() {
        let (store, publisher, bus) = bus(false);
        let counter_id = Uuid::new_v4();

        bus.dispatch(Increment { counter_id, by: 1 }).await.unwrap();
        bus.dispatch(Increment { counter_id, by: 2 }).await.unwrap();

        let stored = store.load_events(counter_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].sequence_number, 2);
        assert_eq!(publisher.batches.lock().unwrap().len(), 2);
    }
}
