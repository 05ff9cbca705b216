//! Business-rule errors for the Account context.

use ledgerflow_core::error::DomainError;
use thiserror::Error;
use uuid::Uuid;

use super::money::{Currency, Money};

/// A business rule of the Account aggregate refused an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    /// The account is not active.
    #[error("account {0} is blocked")]
    Blocked(Uuid),

    /// The withdrawal would go past the debt limit.
    #[error("cannot withdraw {requested} from account {account_id} with balance {balance}")]
    NegativeBalance {
        /// The account.
        account_id: Uuid,
        /// Balance before the attempted withdrawal.
        balance: Money,
        /// The refused amount.
        requested: Money,
    },

    /// The amount is in a different currency than the account.
    #[error("currency mismatch: account holds {expected}, got {actual}")]
    CurrencyMismatch {
        /// The account currency.
        expected: Currency,
        /// The currency of the amount.
        actual: Currency,
    },

    /// Amounts must be greater than zero.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    /// Not a three-letter currency code.
    #[error("invalid currency code {0:?}")]
    InvalidCurrency(String),
}

impl From<AccountError> for DomainError {
    fn from(err: AccountError) -> Self {
        DomainError::rejected(err)
    }
}
