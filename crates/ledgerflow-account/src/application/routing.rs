//! Wires the Account context into the command and event buses.

use std::sync::Arc;

use ledgerflow_core::clock::Clock;
use ledgerflow_core::command_bus::{CommandBus, CommandBusError};
use ledgerflow_core::event_bus::{EventBus, EventSubscriber};

use crate::application::command_handlers::AccountCommandHandler;
use crate::application::subscribers::{AccountActivityLog, AccountSummaryProjection};
use crate::domain::commands::{AddMoney, BlockAccount, CreateAccount, WithdrawMoney};
use crate::domain::events::ACCOUNT_EVENT_TYPES;

/// Routes every Account command to an [`AccountCommandHandler`].
///
/// # Errors
///
/// Returns `CommandBusError::AlreadyRegistered` if `bus` already routes one
/// of the Account commands.
pub fn register_account_handlers(
    bus: &mut CommandBus,
    clock: Arc<dyn Clock>,
) -> Result<(), CommandBusError> {
    let handler = AccountCommandHandler::new(clock);
    bus.register::<CreateAccount, _>(handler.clone())?
        .register::<AddMoney, _>(handler.clone())?
        .register::<WithdrawMoney, _>(handler.clone())?
        .register::<BlockAccount, _>(handler)?;
    Ok(())
}

/// Subscribes the activity log and `projection` to every Account event, in
/// that order.
pub fn register_account_subscribers(bus: &mut EventBus, projection: Arc<AccountSummaryProjection>) {
    let log: Arc<dyn EventSubscriber> = Arc::new(AccountActivityLog);
    let projection: Arc<dyn EventSubscriber> = projection;
    for event_type in ACCOUNT_EVENT_TYPES {
        bus.subscribe(event_type, Arc::clone(&log))
            .subscribe(event_type, Arc::clone(&projection));
    }
}
