//! Commands for the Account context.

use ledgerflow_core::command::Command;
use uuid::Uuid;

/// Command to open an account.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account identifier.
    pub account_id: Uuid,
    /// Three-letter currency code.
    pub currency: String,
}

/// Command to pay money into an account.
#[derive(Debug, Clone)]
pub struct AddMoney {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount to pay in.
    pub amount: i64,
    /// Three-letter currency code.
    pub currency: String,
}

/// Command to take money out of an account.
#[derive(Debug, Clone)]
pub struct WithdrawMoney {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account identifier.
    pub account_id: Uuid,
    /// Amount to take out.
    pub amount: i64,
    /// Three-letter currency code.
    pub currency: String,
}

/// Command to block an account.
#[derive(Debug, Clone)]
pub struct BlockAccount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The account identifier.
    pub account_id: Uuid,
    /// Free-text reason.
    pub cause: String,
}

macro_rules! account_command {
    ($command:ty, $command_type:literal) => {
        impl Command for $command {
            const COMMAND_TYPE: &'static str = $command_type;

            fn aggregate_id(&self) -> Uuid {
                self.account_id
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }
        }
    };
}

account_command!(CreateAccount, "account.create_account");
account_command!(AddMoney, "account.add_money");
account_command!(WithdrawMoney, "account.withdraw_money");
account_command!(BlockAccount, "account.block_account");
