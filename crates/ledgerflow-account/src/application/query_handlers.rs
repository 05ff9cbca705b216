//! Query handlers for the Account context.
//!
//! Queries replay the account from its stream and return read-only view
//! DTOs.

use chrono::{DateTime, Utc};
use ledgerflow_core::aggregate::AggregateRoot;
use ledgerflow_core::error::DomainError;
use ledgerflow_core::repository::AggregateRepository;
use ledgerflow_core::store::{EventStore, StoredEvent};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Account, AccountState};

/// Read-only view of an account aggregate.
#[derive(Debug, Serialize)]
pub struct AccountView {
    /// The account identifier.
    pub account_id: Uuid,
    /// Currency code.
    pub currency: String,
    /// Current balance.
    pub balance: i64,
    /// Debt limit.
    pub debt_limit: i64,
    /// Lifecycle state.
    pub state: AccountState,
    /// Current version (event count).
    pub version: i64,
}

/// One entry of an account's event stream.
#[derive(Debug, Serialize)]
pub struct AccountEventView {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Event type name.
    pub event_type: String,
    /// Position in the stream.
    pub sequence_number: i64,
    /// Event payload.
    pub payload: serde_json::Value,
    /// Correlation ID of the command that produced the event.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl From<StoredEvent> for AccountEventView {
    fn from(event: StoredEvent) -> Self {
        Self {
            event_id: event.event_id,
            event_type: event.event_type,
            sequence_number: event.sequence_number,
            payload: event.payload,
            correlation_id: event.correlation_id,
            occurred_at: event.occurred_at,
        }
    }
}

/// Retrieves an account by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID,
/// or any error from loading or decoding the stream.
pub async fn get_account_by_id(
    account_id: Uuid,
    store: &dyn EventStore,
) -> Result<AccountView, DomainError> {
    let account = AggregateRepository::<Account>::new(store)
        .get(account_id)
        .await?;
    let (Some(state), Some(balance), Some(debt_limit)) =
        (account.state(), account.balance(), account.debt_limit())
    else {
        return Err(DomainError::Infrastructure(format!(
            "stream {account_id} does not start with an account creation"
        )));
    };
    Ok(AccountView {
        account_id,
        currency: balance.currency.to_string(),
        balance: balance.amount,
        debt_limit: debt_limit.amount,
        state,
        version: account.version(),
    })
}

/// Retrieves the raw event stream of an account.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
pub async fn get_account_events(
    account_id: Uuid,
    store: &dyn EventStore,
) -> Result<Vec<AccountEventView>, DomainError> {
    let events = store.load_events(account_id).await?;
    if events.is_empty() {
        return Err(DomainError::AggregateNotFound(account_id));
    }
    Ok(events.into_iter().map(AccountEventView::from).collect())
}
