//! Aggregate root for the Account context.

use ledgerflow_core::aggregate::AggregateRoot;
use ledgerflow_core::clock::Clock;
use ledgerflow_core::event::EventMetadata;
use serde::Serialize;
use uuid::Uuid;

use super::errors::AccountError;
use super::events::{
    ACCOUNT_BLOCKED_EVENT_TYPE, ACCOUNT_CREATED_EVENT_TYPE, AccountBlocked, AccountCreated,
    AccountEvent, AccountEventKind, MONEY_ADDED_EVENT_TYPE, MONEY_WITHDRAWN_EVENT_TYPE,
    MoneyAdded, MoneyWithdrawn,
};
use super::money::{Currency, Money};

/// How far below zero a balance may go, in the account currency.
pub const DEBT_LIMIT: i64 = 500;

/// Lifecycle of an account. Blocked is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    /// Accepts deposits and withdrawals.
    Active,
    /// Refuses every money operation.
    Blocked,
}

/// The aggregate root for a bank account.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// `None` until the account is created.
    state: Option<AccountState>,
    balance: Option<Money>,
    debt_limit: Option<Money>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<AccountEvent>,
}

impl Account {
    /// Opens an account in `currency` with a zero balance.
    #[must_use]
    pub fn new(id: Uuid, currency: Currency, correlation_id: Uuid, clock: &dyn Clock) -> Self {
        let mut account = Self::empty(id);
        let kind = AccountEventKind::AccountCreated(AccountCreated {
            account_id: id,
            currency,
        });
        let event = account.event(ACCOUNT_CREATED_EVENT_TYPE, kind, correlation_id, clock);
        account.record(event);
        account
    }

    /// Lifecycle state, `None` for an account that was never created.
    #[must_use]
    pub fn state(&self) -> Option<AccountState> {
        self.state
    }

    /// Current balance.
    #[must_use]
    pub fn balance(&self) -> Option<&Money> {
        self.balance.as_ref()
    }

    /// The debt limit, fixed at creation.
    #[must_use]
    pub fn debt_limit(&self) -> Option<&Money> {
        self.debt_limit.as_ref()
    }

    /// Pays `money` into the account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Blocked` unless the account is active, or a
    /// validation error for a non-positive or foreign-currency amount.
    pub fn add(
        &mut self,
        money: &Money,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), AccountError> {
        self.ensure_active()?;
        self.validate_amount(money)?;

        let kind = AccountEventKind::MoneyAdded(MoneyAdded {
            account_id: self.id,
            amount: money.amount,
            currency: money.currency.clone(),
        });
        let event = self.event(MONEY_ADDED_EVENT_TYPE, kind, correlation_id, clock);
        self.record(event);
        Ok(())
    }

    /// Takes `money` out of the account. The balance may go negative down to
    /// the debt limit. After the withdrawal the account blocks itself when
    /// the new balance plus the debt limit exceeds the withdrawn amount.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Blocked` unless the account is active,
    /// `AccountError::NegativeBalance` if `balance + debt limit < money`, or a
    /// validation error for a non-positive or foreign-currency amount. No
    /// event is recorded on error.
    pub fn withdraw(
        &mut self,
        money: &Money,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), AccountError> {
        self.ensure_active()?;
        self.validate_amount(money)?;

        let (balance, debt_limit) = self.funds()?;
        if balance.checked_add(debt_limit)?.less_than(money)? {
            return Err(AccountError::NegativeBalance {
                account_id: self.id,
                balance: balance.clone(),
                requested: money.clone(),
            });
        }

        let kind = AccountEventKind::MoneyWithdrawn(MoneyWithdrawn {
            account_id: self.id,
            amount: money.amount,
            currency: money.currency.clone(),
        });
        let event = self.event(MONEY_WITHDRAWN_EVENT_TYPE, kind, correlation_id, clock);
        self.record(event);

        // Checked against the post-withdrawal balance.
        let (balance, debt_limit) = self.funds()?;
        if balance.checked_add(debt_limit)?.greater_than(money)? {
            let cause =
                format!("withdrew more than the balance but within the debt limit of {debt_limit}");
            self.record_blocked(cause, correlation_id, clock);
        }
        Ok(())
    }

    /// Blocks the account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Blocked` if the account is already blocked.
    pub fn block(
        &mut self,
        cause: impl Into<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), AccountError> {
        self.ensure_active()?;
        self.record_blocked(cause.into(), correlation_id, clock);
        Ok(())
    }

    fn record_blocked(&mut self, cause: String, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = AccountEventKind::AccountBlocked(AccountBlocked {
            account_id: self.id,
            cause,
        });
        let event = self.event(ACCOUNT_BLOCKED_EVENT_TYPE, kind, correlation_id, clock);
        self.record(event);
    }

    fn ensure_active(&self) -> Result<(), AccountError> {
        match self.state {
            Some(AccountState::Active) => Ok(()),
            _ => Err(AccountError::Blocked(self.id)),
        }
    }

    fn funds(&self) -> Result<(&Money, &Money), AccountError> {
        match (&self.balance, &self.debt_limit) {
            (Some(balance), Some(debt_limit)) => Ok((balance, debt_limit)),
            _ => Err(AccountError::Blocked(self.id)),
        }
    }

    fn validate_amount(&self, money: &Money) -> Result<(), AccountError> {
        if money.amount <= 0 {
            return Err(AccountError::NonPositiveAmount(money.amount));
        }
        let (balance, _) = self.funds()?;
        if balance.currency != money.currency {
            return Err(AccountError::CurrencyMismatch {
                expected: balance.currency.clone(),
                actual: money.currency.clone(),
            });
        }
        Ok(())
    }

    // TODO: event_id uses Uuid::new_v4(); thread an id generator through
    // alongside the clock to make recorded events fully reproducible.
    fn event(
        &self,
        event_type: &str,
        kind: AccountEventKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> AccountEvent {
        AccountEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: event_type.to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        }
    }
}

impl AggregateRoot for Account {
    type Event = AccountEvent;

    fn empty(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            state: None,
            balance: None,
            debt_limit: None,
            uncommitted_events: Vec::new(),
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            AccountEventKind::AccountCreated(payload) => {
                self.state = Some(AccountState::Active);
                self.balance = Some(Money::zero(payload.currency.clone()));
                self.debt_limit = Some(Money::new(DEBT_LIMIT, payload.currency.clone()));
            }
            AccountEventKind::MoneyAdded(payload) => {
                if let Some(balance) = self.balance.as_mut() {
                    balance.amount = balance.amount.saturating_add(payload.amount);
                }
            }
            AccountEventKind::MoneyWithdrawn(payload) => {
                if let Some(balance) = self.balance.as_mut() {
                    balance.amount = balance.amount.saturating_sub(payload.amount);
                }
            }
            AccountEventKind::AccountBlocked(_) => {
                self.state = Some(AccountState::Blocked);
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn push_uncommitted(&mut self, event: Self::Event) {
        self.uncommitted_events.push(event);
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
