//! Money and currency value objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::AccountError;

/// An ISO-4217 style currency code: three ASCII letters, upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a currency code, normalizing it to upper case.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCurrency` unless `code` is exactly three
    /// ASCII letters.
    pub fn parse(code: &str) -> Result<Self, AccountError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AccountError::InvalidCurrency(code.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = AccountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A whole-unit amount in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Signed amount; balances may go below zero down to the debt limit.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
}

impl Money {
    /// Creates an amount.
    #[must_use]
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in `currency`.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Sum of two amounts.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::CurrencyMismatch` if the currencies differ.
    pub fn checked_add(&self, other: &Money) -> Result<Money, AccountError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(
            self.amount.saturating_add(other.amount),
            self.currency.clone(),
        ))
    }

    /// Difference of two amounts.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::CurrencyMismatch` if the currencies differ.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, AccountError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(
            self.amount.saturating_sub(other.amount),
            self.currency.clone(),
        ))
    }

    /// Returns `true` if `self` is below `other`. Both must share a currency.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::CurrencyMismatch` if the currencies differ.
    pub fn less_than(&self, other: &Money) -> Result<bool, AccountError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount < other.amount)
    }

    /// Returns `true` if `self` is above `other`. Both must share a currency.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::CurrencyMismatch` if the currencies differ.
    pub fn greater_than(&self, other: &Money) -> Result<bool, AccountError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount > other.amount)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), AccountError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(AccountError::CurrencyMismatch {
                expected: self.currency.clone(),
                actual: other.currency.clone(),
            })
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.currency)
    }
}
