//! Domain events for the Account context.

use ledgerflow_core::error::DomainError;
use ledgerflow_core::event::{DomainEvent, EventMetadata};
use ledgerflow_core::store::StoredEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{Currency, Money};

/// Event type identifier for [`AccountCreated`].
pub const ACCOUNT_CREATED_EVENT_TYPE: &str = "account.account_created";
/// Event type identifier for [`MoneyAdded`].
pub const MONEY_ADDED_EVENT_TYPE: &str = "account.money_added";
/// Event type identifier for [`MoneyWithdrawn`].
pub const MONEY_WITHDRAWN_EVENT_TYPE: &str = "account.money_withdrawn";
/// Event type identifier for [`AccountBlocked`].
pub const ACCOUNT_BLOCKED_EVENT_TYPE: &str = "account.account_blocked";

/// Every event type this context emits.
pub const ACCOUNT_EVENT_TYPES: [&str; 4] = [
    ACCOUNT_CREATED_EVENT_TYPE,
    MONEY_ADDED_EVENT_TYPE,
    MONEY_WITHDRAWN_EVENT_TYPE,
    ACCOUNT_BLOCKED_EVENT_TYPE,
];

/// Emitted when an account is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCreated {
    /// The account identifier.
    pub account_id: Uuid,
    /// Currency of every amount on the account.
    pub currency: Currency,
}

/// Emitted when money is paid into an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyAdded {
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount paid in.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
}

/// Emitted when money is taken out of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyWithdrawn {
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount taken out.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
}

/// Emitted when an account is blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBlocked {
    /// The account identifier.
    pub account_id: Uuid,
    /// Free-text reason.
    pub cause: String,
}

impl MoneyAdded {
    /// The amount as `Money`.
    #[must_use]
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency.clone())
    }
}

impl MoneyWithdrawn {
    /// The amount as `Money`.
    #[must_use]
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency.clone())
    }
}

/// Event payload variants for the Account context.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEventKind {
    /// The account was opened.
    AccountCreated(AccountCreated),
    /// Money was paid in.
    MoneyAdded(MoneyAdded),
    /// Money was taken out.
    MoneyWithdrawn(MoneyWithdrawn),
    /// The account was blocked.
    AccountBlocked(AccountBlocked),
}

/// Domain event envelope for the Account context.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: AccountEventKind,
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            AccountEventKind::AccountCreated(_) => ACCOUNT_CREATED_EVENT_TYPE,
            AccountEventKind::MoneyAdded(_) => MONEY_ADDED_EVENT_TYPE,
            AccountEventKind::MoneyWithdrawn(_) => MONEY_WITHDRAWN_EVENT_TYPE,
            AccountEventKind::AccountBlocked(_) => ACCOUNT_BLOCKED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        let payload = match &self.kind {
            AccountEventKind::AccountCreated(p) => serde_json::to_value(p),
            AccountEventKind::MoneyAdded(p) => serde_json::to_value(p),
            AccountEventKind::MoneyWithdrawn(p) => serde_json::to_value(p),
            AccountEventKind::AccountBlocked(p) => serde_json::to_value(p),
        };
        payload.expect("AccountEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let payload = stored.payload.clone();
        let kind = match stored.event_type.as_str() {
            ACCOUNT_CREATED_EVENT_TYPE => {
                AccountEventKind::AccountCreated(serde_json::from_value(payload)?)
            }
            MONEY_ADDED_EVENT_TYPE => AccountEventKind::MoneyAdded(serde_json::from_value(payload)?),
            MONEY_WITHDRAWN_EVENT_TYPE => {
                AccountEventKind::MoneyWithdrawn(serde_json::from_value(payload)?)
            }
            ACCOUNT_BLOCKED_EVENT_TYPE => {
                AccountEventKind::AccountBlocked(serde_json::from_value(payload)?)
            }
            other => {
                return Err(DomainError::UnknownEventType {
                    aggregate_id: stored.aggregate_id,
                    event_type: other.to_owned(),
                });
            }
        };
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn stored(event_type: &str, payload: serde_json::Value) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            payload,
            sequence_number: 1,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_from_stored_decodes_money_withdrawn() {
        // Arrange
        let account_id = Uuid::new_v4();
        let event = stored(
            MONEY_WITHDRAWN_EVENT_TYPE,
            serde_json::json!({"account_id": account_id, "amount": 200, "currency": "PLN"}),
        );

        // Act
        let decoded = AccountEvent::from_stored(&event).unwrap();

        // Assert
        assert_eq!(decoded.event_type(), MONEY_WITHDRAWN_EVENT_TYPE);
        assert_eq!(decoded.metadata().event_id, event.event_id);
        match decoded.kind {
            AccountEventKind::MoneyWithdrawn(payload) => {
                assert_eq!(payload.account_id, account_id);
                assert_eq!(payload.money().to_string(), "200PLN");
            }
            other => panic!("expected MoneyWithdrawn, got {other:?}"),
        }
    }

    #[test]
    fn test_to_stored_writes_flat_payload() {
        let account_id = Uuid::new_v4();
        let original = AccountEvent::from_stored(&stored(
            ACCOUNT_BLOCKED_EVENT_TYPE,
            serde_json::json!({"account_id": account_id, "cause": "fraud"}),
        ))
        .unwrap();

        let written = original.to_stored();

        assert_eq!(written.event_type, ACCOUNT_BLOCKED_EVENT_TYPE);
        assert_eq!(
            written.payload,
            serde_json::json!({"account_id": account_id, "cause": "fraud"})
        );
        assert_eq!(AccountEvent::from_stored(&written).unwrap(), original);
    }

    #[test]
    fn test_from_stored_rejects_unknown_event_type() {
        let event = stored("account.renamed", serde_json::json!({}));

        let result = AccountEvent::from_stored(&event);

        match result {
            Err(DomainError::UnknownEventType {
                aggregate_id,
                event_type,
            }) => {
                assert_eq!(aggregate_id, event.aggregate_id);
                assert_eq!(event_type, "account.renamed");
            }
            other => panic!("expected UnknownEventType, got {other:?}"),
        }
    }

    #[test]
    fn test_from_stored_rejects_malformed_payload() {
        let event = stored(MONEY_ADDED_EVENT_TYPE, serde_json::json!({"amount": "lots"}));

        let result = AccountEvent::from_stored(&event);

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
