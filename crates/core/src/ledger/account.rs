//! Account records and the balance rules attached to each account type.

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use ledgerline_shared::types::{AccountId, Money, UserId};

use super::error::LedgerError;

/// Number of digits in a display-facing account number.
pub const ACCOUNT_NUMBER_DIGITS: usize = 12;

/// Account product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Everyday checking account; never overdrawn.
    Checking,
    /// Savings account; never overdrawn.
    Savings,
    /// Credit line; negative balance is the amount owed.
    Credit,
}

impl AccountType {
    /// Returns the lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
        }
    }

    /// Returns true if debits are bounded by a credit limit rather than the balance.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Credit)
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// A bank account as held by the Account Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque identifier.
    pub id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Display-facing account number.
    pub account_number: String,
    /// Product type.
    pub account_type: AccountType,
    /// Current balance.
    pub balance: Money,
    /// Credit limit (zero for checking and savings).
    pub credit_limit: Money,
    /// Bumped on every balance change.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Builds a fresh account for `user_id` with a generated number.
    #[must_use]
    pub fn open(user_id: UserId, account_type: AccountType, opening_balance: Money) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            account_number: generate_account_number(),
            account_type,
            balance: opening_balance,
            credit_limit: Money::ZERO,
            version: 0,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Sets the credit limit (meaningful for credit accounts only).
    #[must_use]
    pub fn with_credit_limit(mut self, limit: Money) -> Self {
        self.credit_limit = limit;
        self
    }

    /// Returns true if `user_id` owns this account.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Funds that may be debited right now.
    ///
    /// Checking/savings: the balance. Credit: limit plus (possibly negative) balance.
    #[must_use]
    pub fn available_funds(&self) -> Money {
        if self.account_type.is_credit() {
            self.credit_limit.saturating_add(self.balance)
        } else {
            self.balance
        }
    }

    /// Checks that `amount` can be debited without breaking the account's balance rule.
    pub fn ensure_can_debit(&self, amount: Money) -> Result<(), LedgerError> {
        let available = self.available_funds();
        if amount <= available {
            return Ok(());
        }

        if self.account_type.is_credit() {
            Err(LedgerError::InsufficientCredit {
                account_id: self.id,
                available,
                requested: amount,
            })
        } else {
            Err(LedgerError::InsufficientFunds {
                account_id: self.id,
                available,
                requested: amount,
            })
        }
    }

    /// Returns the balance after applying `delta`, or an error if it would break the
    /// balance rule for this account type.
    pub fn balance_after(&self, delta: Money) -> Result<Money, LedgerError> {
        let next = self
            .balance
            .checked_add(delta)
            .filter(|next| next.is_storable())
            .ok_or(LedgerError::BalanceLimitExceeded(self.id))?;

        let floor = if self.account_type.is_credit() {
            -self.credit_limit
        } else {
            Money::ZERO
        };

        if delta.is_negative() && next < floor {
            self.ensure_can_debit(-delta)?;
            return Err(LedgerError::Internal("balance rule violated".to_string()));
        }

        Ok(next)
    }

    /// Compact view used to enrich statement lines.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            account_number: self.account_number.clone(),
            account_type: self.account_type,
        }
    }
}

/// Account identity without balance, safe to show to counterparties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Account ID.
    pub id: AccountId,
    /// Display-facing account number.
    pub account_number: String,
    /// Product type.
    pub account_type: AccountType,
}

/// Opening balances used when a user's default account set is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultAccounts {
    /// Opening balance of the checking account.
    pub checking_balance: Money,
    /// Opening balance of the savings account.
    pub savings_balance: Money,
}

impl DefaultAccounts {
    /// Builds the default set (checking first, then savings) for `user_id`.
    #[must_use]
    pub fn build(&self, user_id: UserId) -> Vec<Account> {
        let checking = Account::open(user_id, AccountType::Checking, self.checking_balance);
        let mut savings = Account::open(user_id, AccountType::Savings, self.savings_balance);
        // keep listing order stable even when both land in the same microsecond
        if savings.created_at <= checking.created_at {
            savings.created_at = checking.created_at + chrono::Duration::microseconds(1);
        }
        vec![checking, savings]
    }
}

impl Default for DefaultAccounts {
    fn default() -> Self {
        Self {
            checking_balance: Money::from_cents(1_000_00),
            savings_balance: Money::from_cents(5_000_00),
        }
    }
}

/// Generates a random 12-digit account number without a leading zero.
#[must_use]
pub fn generate_account_number() -> String {
    let mut rng = rand::rng();
    let first = rng.random_range(1..=9u8);
    let mut number = String::with_capacity(ACCOUNT_NUMBER_DIGITS);
    number.push(char::from(b'0' + first));
    for _ in 1..ACCOUNT_NUMBER_DIGITS {
        number.push(char::from(b'0' + rng.random_range(0..=9u8)));
    }
    number
}
