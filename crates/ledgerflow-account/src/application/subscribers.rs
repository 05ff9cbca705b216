//! Event subscribers for the Account context: an activity log and the
//! account summary projection.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use ledgerflow_core::error::DomainError;
use ledgerflow_core::event::DomainEvent;
use ledgerflow_core::event_bus::EventSubscriber;
use ledgerflow_core::store::StoredEvent;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{AccountState, DEBT_LIMIT};
use crate::domain::events::{AccountEvent, AccountEventKind};

/// Logs one line per committed account event.
#[derive(Debug, Default)]
pub struct AccountActivityLog;

#[async_trait]
impl EventSubscriber for AccountActivityLog {
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let event = AccountEvent::from_stored(event)?;
        let account_id = event.metadata.aggregate_id;
        match &event.kind {
            AccountEventKind::AccountCreated(p) => {
                tracing::info!(%account_id, currency = %p.currency, "account created");
            }
            AccountEventKind::MoneyAdded(p) => {
                tracing::info!(%account_id, amount = p.amount, currency = %p.currency, "money added");
            }
            AccountEventKind::MoneyWithdrawn(p) => {
                tracing::info!(%account_id, amount = p.amount, currency = %p.currency, "money withdrawn");
            }
            AccountEventKind::AccountBlocked(p) => {
                tracing::warn!(%account_id, cause = %p.cause, "account blocked");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "account_activity_log"
    }
}

/// Summary row of the account projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    /// The account identifier.
    pub account_id: Uuid,
    /// Currency code.
    pub currency: String,
    /// Balance after the last applied event.
    pub balance: i64,
    /// Debt limit.
    pub debt_limit: i64,
    /// Lifecycle state.
    pub state: AccountState,
    /// Sequence number of the last applied event.
    pub last_sequence_number: i64,
}

/// Per-account fold of the events seen so far, in any arrival order.
#[derive(Debug, Default)]
struct Entry {
    /// Set once `AccountCreated` has been applied.
    currency: Option<String>,
    balance: i64,
    blocked: bool,
    /// Every sequence number up to here has been applied.
    watermark: i64,
    /// Applied sequence numbers past a gap above `watermark`.
    ahead: BTreeSet<i64>,
}

impl Entry {
    /// Marks `sequence_number` applied. Returns `false` if it already was.
    fn mark_applied(&mut self, sequence_number: i64) -> bool {
        if sequence_number <= self.watermark || !self.ahead.insert(sequence_number) {
            return false;
        }
        while self.ahead.remove(&(self.watermark + 1)) {
            self.watermark += 1;
        }
        true
    }

    fn last_sequence_number(&self) -> i64 {
        self.ahead.last().copied().unwrap_or(self.watermark)
    }

    fn summary(&self, account_id: Uuid) -> Option<AccountSummary> {
        let currency = self.currency.clone()?;
        Some(AccountSummary {
            account_id,
            currency,
            balance: self.balance,
            debt_limit: DEBT_LIMIT,
            state: if self.blocked {
                AccountState::Blocked
            } else {
                AccountState::Active
            },
            last_sequence_number: self.last_sequence_number(),
        })
    }
}

type Entries = HashMap<Uuid, Entry>;

/// Read model of every account, kept current from published events.
///
/// Concurrent commits may publish out of order, even ahead of the account's
/// creation. Events are folded as commutative deltas and deduplicated by
/// sequence number; an account is listed once its creation has arrived.
#[derive(Debug, Default)]
pub struct AccountSummaryProjection {
    entries: RwLock<Entries>,
}

impl AccountSummaryProjection {
    /// Creates an empty projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every created account, ordered by account id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn summaries(&self) -> Result<Vec<AccountSummary>, DomainError> {
        let mut summaries: Vec<AccountSummary> = self
            .read()?
            .iter()
            .filter_map(|(account_id, entry)| entry.summary(*account_id))
            .collect();
        summaries.sort_by_key(|summary| summary.account_id);
        Ok(summaries)
    }

    /// The summary of one account, `None` until its creation has arrived.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn summary(&self, account_id: Uuid) -> Result<Option<AccountSummary>, DomainError> {
        Ok(self
            .read()?
            .get(&account_id)
            .and_then(|entry| entry.summary(account_id)))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>, DomainError> {
        self.entries
            .read()
            .map_err(|_| DomainError::Infrastructure("account projection lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>, DomainError> {
        self.entries
            .write()
            .map_err(|_| DomainError::Infrastructure("account projection lock poisoned".into()))
    }

    fn apply(&self, event: &AccountEvent) -> Result<(), DomainError> {
        let account_id = event.metadata.aggregate_id;
        let sequence_number = event.metadata.sequence_number;
        let mut entries = self.write()?;
        let entry = entries.entry(account_id).or_default();

        if !entry.mark_applied(sequence_number) {
            tracing::debug!(%account_id, sequence_number, "skipping already applied event");
            return Ok(());
        }
        match &event.kind {
            AccountEventKind::AccountCreated(p) => entry.currency = Some(p.currency.to_string()),
            AccountEventKind::MoneyAdded(p) => {
                entry.balance = entry.balance.saturating_add(p.amount);
            }
            AccountEventKind::MoneyWithdrawn(p) => {
                entry.balance = entry.balance.saturating_sub(p.amount);
            }
            AccountEventKind::AccountBlocked(_) => entry.blocked = true,
        }
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for AccountSummaryProjection {
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let event = AccountEvent::from_stored(event)?;
        self.apply(&event)
    }

    fn name(&self) -> &'static str {
        "account_summary_projection"
    }
}
