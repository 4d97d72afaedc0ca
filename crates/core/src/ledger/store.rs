//! Storage seam for the ledger.
//!
//! [`LedgerStore`] covers reads and one-shot provisioning. Every balance
//! change goes through a [`LedgerUnitOfWork`] obtained from
//! [`LedgerStore::begin`]: accounts are locked in ascending id order, balances
//! are adjusted, the journal entry is appended, and everything becomes visible
//! together on [`LedgerUnitOfWork::commit`].

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_shared::types::{AccountId, Money, TransactionId, UserId};

use super::account::{Account, DefaultAccounts};
use super::error::{LedgerError, LedgerResult};
use super::transaction::Transaction;

/// Read-only view of a user, owned by the identity subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub id: UserId,
    /// Email address.
    pub email: String,
    /// Unique handle.
    pub username: String,
    /// Name shown to counterparties.
    pub display_name: String,
}

/// How a recipient is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientLookup {
    /// Case-insensitive email match.
    Email(String),
    /// Exact username match.
    Username(String),
}

impl RecipientLookup {
    /// Classifies an identifier: anything containing `@` is an email.
    #[must_use]
    pub fn parse(identifier: &str) -> Self {
        if identifier.contains('@') {
            Self::Email(identifier.to_string())
        } else {
            Self::Username(identifier.to_string())
        }
    }

    /// Returns true if `profile` matches this lookup.
    #[must_use]
    pub fn matches(&self, profile: &UserProfile) -> bool {
        match self {
            Self::Email(email) => profile.email.eq_ignore_ascii_case(email),
            Self::Username(username) => profile.username == *username,
        }
    }
}

/// Keyset position in a statement: entries strictly older than this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementCursor {
    /// Creation time of the last entry seen.
    pub created_at: DateTime<Utc>,
    /// Id of the last entry seen.
    pub id: TransactionId,
}

impl StatementCursor {
    /// Cursor pointing just past `transaction`.
    #[must_use]
    pub fn after(transaction: &Transaction) -> Self {
        Self {
            created_at: transaction.created_at,
            id: transaction.id,
        }
    }

    /// Encodes as `<unix micros>:<uuid>`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}:{}", self.created_at.timestamp_micros(), self.id)
    }

    /// Parses a cursor produced by [`encode`](Self::encode).
    ///
    /// Returns `None` for anything malformed.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let (micros, id) = raw.split_once(':')?;
        let micros: i64 = micros.parse().ok()?;
        let created_at = Utc.timestamp_micros(micros).single()?;
        let id = id.parse().ok()?;
        Some(Self { created_at, id })
    }

    /// Returns true if `transaction` sorts strictly after this cursor (older).
    #[must_use]
    pub fn precedes(&self, transaction: &Transaction) -> bool {
        transaction.ordering_key() < (self.created_at, self.id)
    }
}

/// Journal query over a set of accounts, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalQuery {
    /// Transactions touching any of these accounts.
    pub account_ids: Vec<AccountId>,
    /// Page size.
    pub limit: u64,
    /// Entries to skip.
    pub offset: u64,
    /// Only entries strictly older than this.
    pub before: Option<StatementCursor>,
}

/// Read access and provisioning for accounts, journal and user profiles.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Accounts owned by `user_id`, ordered by `(created_at, id)`.
    async fn accounts_for_user(&self, user_id: UserId) -> LedgerResult<Vec<Account>>;

    /// Creates the default account set if the user has no accounts yet.
    ///
    /// Concurrent calls for the same user create exactly one set. Returns the
    /// user's accounts afterwards, ordered like [`accounts_for_user`](Self::accounts_for_user).
    async fn provision_accounts(
        &self,
        user_id: UserId,
        defaults: &DefaultAccounts,
    ) -> LedgerResult<Vec<Account>>;

    /// Single account, or `None` if it does not exist.
    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>>;

    /// All accounts among `ids` that exist, in no particular order.
    async fn get_accounts(&self, ids: &[AccountId]) -> LedgerResult<Vec<Account>>;

    /// User profile matching `lookup`.
    async fn find_user(&self, lookup: &RecipientLookup) -> LedgerResult<Option<UserProfile>>;

    /// Transaction previously committed by `user_id` with `key`.
    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> LedgerResult<Option<Transaction>>;

    /// One page of transactions touching `query.account_ids`, each at most once,
    /// ordered `(created_at desc, id desc)`.
    async fn query_journal(&self, query: &JournalQuery) -> LedgerResult<Vec<Transaction>>;

    /// Number of transactions touching any of `account_ids`.
    async fn count_journal(&self, account_ids: &[AccountId]) -> LedgerResult<u64>;

    /// Opens a unit of work for a money movement.
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerUnitOfWork>>;

    /// Checks the backend is reachable.
    async fn ping(&self) -> LedgerResult<()>;

    /// Releases backend resources. Further calls may fail.
    async fn close(&self) -> LedgerResult<()>;
}

/// A single atomic money movement.
///
/// Dropping a unit of work without committing discards it.
#[async_trait]
pub trait LedgerUnitOfWork: Send {
    /// Locks the accounts among `ids` that exist, in ascending id order, and
    /// returns snapshots taken under the lock.
    async fn lock_accounts(&mut self, ids: &[AccountId]) -> LedgerResult<Vec<Account>>;

    /// Adds `delta` to a locked account's balance and bumps its version.
    ///
    /// # Errors
    ///
    /// `ConcurrentModification` if a backend that re-checks versions on write
    /// finds the row changed since it was locked, `BalanceLimitExceeded` if the
    /// result does not fit the balance column, `Internal` if the account was
    /// never locked.
    async fn adjust_balance(&mut self, account_id: AccountId, delta: Money) -> LedgerResult<Account>;

    /// Appends a journal entry.
    ///
    /// # Errors
    ///
    /// `DuplicateIdempotencyKey` if the initiator already used the key.
    async fn append(&mut self, transaction: &Transaction) -> LedgerResult<()>;

    /// Makes every change visible at once.
    async fn commit(self: Box<Self>) -> LedgerResult<()>;

    /// Discards every change.
    async fn rollback(self: Box<Self>) -> LedgerResult<()>;
}

/// Finds `id` among locked snapshots.
pub(crate) fn find_locked(accounts: &[Account], id: AccountId) -> Option<&Account> {
    accounts.iter().find(|a| a.id == id)
}

/// Maps an account that is missing or not owned by `user_id` to `InvalidAccountAccess`.
pub(crate) fn owned_account(
    accounts: &[Account],
    id: AccountId,
    user_id: UserId,
) -> LedgerResult<&Account> {
    find_locked(accounts, id)
        .filter(|a| a.is_owned_by(user_id))
        .ok_or(LedgerError::InvalidAccountAccess(id))
}
