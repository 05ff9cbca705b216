//! Command handlers for the Account context.
//!
//! Each handler loads the account through an `AggregateRepository`, calls one
//! business method and saves. Run through the command bus, the store they
//! receive is an open transaction.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerflow_core::clock::Clock;
use ledgerflow_core::command_bus::CommandHandler;
use ledgerflow_core::error::DomainError;
use ledgerflow_core::repository::AggregateRepository;
use ledgerflow_core::store::{EventStore, StoredEvent};
use uuid::Uuid;

use crate::domain::aggregates::Account;
use crate::domain::commands::{AddMoney, BlockAccount, CreateAccount, WithdrawMoney};
use crate::domain::money::{Currency, Money};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct AccountCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Handles the `CreateAccount` command: opens the account and persists the
/// creation event.
///
/// # Errors
///
/// Returns a rejected `AccountError::InvalidCurrency` for a malformed code,
/// or `DomainError::ConcurrencyConflict` if the account already exists.
pub async fn handle_create_account(
    command: &CreateAccount,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<AccountCommandResult, DomainError> {
    let currency = Currency::parse(&command.currency)?;
    let mut account = Account::new(command.account_id, currency, command.correlation_id, clock);

    let stored_events = AggregateRepository::new(store).save(&mut account).await?;
    tracing::info!(account_id = %command.account_id, currency = %command.currency, "account created");

    Ok(AccountCommandResult {
        aggregate_id: command.account_id,
        stored_events,
    })
}

/// Handles the `AddMoney` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the account does not exist,
/// a rejected `AccountError` if a business rule refuses the deposit, or any
/// store error.
pub async fn handle_add_money(
    command: &AddMoney,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<AccountCommandResult, DomainError> {
    let money = Money::new(command.amount, Currency::parse(&command.currency)?);
    let repo = AggregateRepository::<Account>::new(store);
    let mut account = repo.get(command.account_id).await?;

    account.add(&money, command.correlation_id, clock)?;

    let stored_events = repo.save(&mut account).await?;
    Ok(AccountCommandResult {
        aggregate_id: command.account_id,
        stored_events,
    })
}

/// Handles the `WithdrawMoney` command. The account may block itself as part
/// of the withdrawal; both events are saved together.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the account does not exist,
/// a rejected `AccountError` (`Blocked`, `NegativeBalance`, ...) if a
/// business rule refuses the withdrawal, or any store error.
pub async fn handle_withdraw_money(
    command: &WithdrawMoney,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<AccountCommandResult, DomainError> {
    let money = Money::new(command.amount, Currency::parse(&command.currency)?);
    let repo = AggregateRepository::<Account>::new(store);
    let mut account = repo.get(command.account_id).await?;

    account.withdraw(&money, command.correlation_id, clock)?;

    let stored_events = repo.save(&mut account).await?;
    Ok(AccountCommandResult {
        aggregate_id: command.account_id,
        stored_events,
    })
}

/// Handles the `BlockAccount` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the account does not exist,
/// a rejected `AccountError::Blocked` if it is already blocked, or any
/// store error.
pub async fn handle_block_account(
    command: &BlockAccount,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<AccountCommandResult, DomainError> {
    let repo = AggregateRepository::<Account>::new(store);
    let mut account = repo.get(command.account_id).await?;

    account.block(command.cause.clone(), command.correlation_id, clock)?;

    let stored_events = repo.save(&mut account).await?;
    tracing::info!(account_id = %command.account_id, cause = %command.cause, "account blocked");
    Ok(AccountCommandResult {
        aggregate_id: command.account_id,
        stored_events,
    })
}

/// Command bus handler for every Account command.
#[derive(Clone)]
pub struct AccountCommandHandler {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AccountCommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCommandHandler").finish_non_exhaustive()
    }
}

impl AccountCommandHandler {
    /// Creates a handler stamping events with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl CommandHandler<CreateAccount> for AccountCommandHandler {
    async fn handle(&self, command: CreateAccount, store: &dyn EventStore) -> Result<(), DomainError> {
        handle_create_account(&command, self.clock.as_ref(), store).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<AddMoney> for AccountCommandHandler {
    async fn handle(&self, command: AddMoney, store: &dyn EventStore) -> Result<(), DomainError> {
        handle_add_money(&command, self.clock.as_ref(), store).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<WithdrawMoney> for AccountCommandHandler {
    async fn handle(&self, command: WithdrawMoney, store: &dyn EventStore) -> Result<(), DomainError> {
        handle_withdraw_money(&command, self.clock.as_ref(), store).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<BlockAccount> for AccountCommandHandler {
    async fn handle(&self, command: BlockAccount, store: &dyn EventStore) -> Result<(), DomainError> {
        handle_block_account(&command, self.clock.as_ref(), store).await?;
        Ok(())
    }
}
