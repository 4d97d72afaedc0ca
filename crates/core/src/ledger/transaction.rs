//! Journal transaction records.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_shared::types::{AccountId, Money, TransactionId, UserId};

/// What kind of money movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// External money into an account (no source).
    Deposit,
    /// Money out of an account to the outside (no destination).
    Withdrawal,
    /// Between two accounts of the same user.
    Transfer,
    /// From one user to another.
    Payment,
}

impl TransactionKind {
    /// Returns the lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction lifecycle status.
///
/// Engine operations are synchronous, so only `Completed` is ever written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Not yet applied.
    Pending,
    /// Applied to balances.
    #[default]
    Completed,
    /// Rejected after submission.
    Failed,
    /// Withdrawn by the initiator.
    Cancelled,
}

impl TransactionStatus {
    /// Returns the lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Debited account; `None` for deposits.
    pub source_account_id: Option<AccountId>,
    /// Credited account; `None` for withdrawals.
    pub destination_account_id: Option<AccountId>,
    /// Strictly positive amount.
    pub amount: Money,
    /// Kind of movement.
    pub kind: TransactionKind,
    /// Status.
    pub status: TransactionStatus,
    /// Free-text description.
    pub description: Option<String>,
    /// User who initiated the movement.
    pub initiated_by: UserId,
    /// Client-supplied key, unique per initiating user.
    pub idempotency_key: Option<String>,
    /// Creation time, microsecond precision.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a completed transaction stamped with the current time.
    #[must_use]
    pub fn completed(
        kind: TransactionKind,
        source_account_id: Option<AccountId>,
        destination_account_id: Option<AccountId>,
        amount: Money,
        initiated_by: UserId,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            source_account_id,
            destination_account_id,
            amount,
            kind,
            status: TransactionStatus::Completed,
            description: None,
            initiated_by,
            idempotency_key: None,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }

    /// Returns true if the transaction debits or credits `account_id`.
    #[must_use]
    pub fn touches(&self, account_id: AccountId) -> bool {
        self.source_account_id == Some(account_id) || self.destination_account_id == Some(account_id)
    }

    /// Returns true if this transaction was produced by the same request shape.
    ///
    /// Used to decide whether a repeated idempotency key is a replay or a conflict.
    #[must_use]
    pub fn matches_request(
        &self,
        kind: TransactionKind,
        source_account_id: Option<AccountId>,
        destination_account_id: Option<AccountId>,
        amount: Money,
    ) -> bool {
        self.kind == kind
            && self.source_account_id == source_account_id
            && self.destination_account_id == destination_account_id
            && self.amount == amount
    }

    /// Sort key for statements: newest first, ties broken by id.
    #[must_use]
    pub fn ordering_key(&self) -> (DateTime<Utc>, TransactionId) {
        (self.created_at, self.id)
    }
}

/// Direction of a statement line relative to the viewing user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money left one of the user's accounts.
    Outgoing,
    /// Money arrived in one of the user's accounts.
    Incoming,
    /// Both sides belong to the user.
    Internal,
}

impl Direction {
    /// Classifies `transaction` given a predicate for "is this one of my accounts".
    #[must_use]
    pub fn classify(transaction: &Transaction, owns: impl Fn(AccountId) -> bool) -> Self {
        let from_me = transaction.source_account_id.is_some_and(&owns);
        let to_me = transaction.destination_account_id.is_some_and(&owns);
        match (from_me, to_me) {
            (true, true) => Self::Internal,
            (true, false) => Self::Outgoing,
            _ => Self::Incoming,
        }
    }
}
