//! Shared application state and the composition root.

use std::sync::Arc;

use ledgerflow_account::application::routing::{
    register_account_handlers, register_account_subscribers,
};
use ledgerflow_account::application::subscribers::AccountSummaryProjection;
use ledgerflow_core::clock::Clock;
use ledgerflow_core::command_bus::{CommandBus, CommandBusError};
use ledgerflow_core::event_bus::EventBus;
use ledgerflow_core::store::EventStore;
use ledgerflow_core::transaction::TransactionManager;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Routes account commands through a transaction and publishes the
    /// committed events.
    pub commands: Arc<CommandBus>,
    /// Store read by queries.
    pub event_store: Arc<dyn EventStore>,
    /// Account summaries kept current by the event bus.
    pub projection: Arc<AccountSummaryProjection>,
}

impl AppState {
    /// Wires the buses, handlers and subscribers around `event_store`.
    ///
    /// # Errors
    ///
    /// Returns `CommandBusError::AlreadyRegistered` if a command is routed
    /// twice.
    pub fn new(
        event_store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CommandBusError> {
        let projection = Arc::new(AccountSummaryProjection::new());

        let mut events = EventBus::new();
        register_account_subscribers(&mut events, Arc::clone(&projection));

        let mut commands = CommandBus::new(
            TransactionManager::new(Arc::clone(&event_store)),
            Arc::new(events),
        );
        register_account_handlers(&mut commands, clock)?;

        Ok(Self {
            commands: Arc::new(commands),
            event_store,
            projection,
        })
    }
}
