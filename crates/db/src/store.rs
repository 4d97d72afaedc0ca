//! PostgreSQL implementation of the ledger store.
//!
//! A unit of work is one database transaction. Accounts are locked with
//! `SELECT ... FOR UPDATE` in ascending id order; balance writes carry the
//! version read under the lock and fail if it moved.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tracing::warn;

use ledgerline_core::ledger::{
    Account, DefaultAccounts, JournalQuery, LedgerError, LedgerResult, LedgerStore,
    LedgerUnitOfWork, RecipientLookup, Transaction, UserProfile,
};
use ledgerline_shared::types::{AccountId, Money, UserId};

use crate::repositories::{
    AccountError, AccountRepository, JournalKeyset, TransactionError, TransactionRepository,
    UserRepository,
};

fn storage(err: DbErr) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

/// [`LedgerStore`] over a SeaORM PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    users: UserRepository,
}

impl PgLedgerStore {
    /// Creates a store over `db`.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            transactions: TransactionRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            db,
        }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn accounts_for_user(&self, user_id: UserId) -> LedgerResult<Vec<Account>> {
        let models = self
            .accounts
            .list_for_user(user_id.into_inner())
            .await
            .map_err(storage)?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn provision_accounts(
        &self,
        user_id: UserId,
        defaults: &DefaultAccounts,
    ) -> LedgerResult<Vec<Account>> {
        let models = self
            .accounts
            .provision_defaults(user_id, defaults)
            .await
            .map_err(storage)?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        let model = self
            .accounts
            .find_by_id(account_id.into_inner())
            .await
            .map_err(storage)?;
        Ok(model.map(Account::from))
    }

    async fn get_accounts(&self, ids: &[AccountId]) -> LedgerResult<Vec<Account>> {
        let ids: Vec<_> = ids.iter().map(|id| id.into_inner()).collect();
        let models = self.accounts.find_by_ids(&ids).await.map_err(storage)?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn find_user(&self, lookup: &RecipientLookup) -> LedgerResult<Option<UserProfile>> {
        let model = match lookup {
            RecipientLookup::Email(email) => self.users.find_by_email(email).await,
            RecipientLookup::Username(username) => self.users.find_by_username(username).await,
        }
        .map_err(storage)?;
        Ok(model.map(UserProfile::from))
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> LedgerResult<Option<Transaction>> {
        let model = self
            .transactions
            .find_by_idempotency_key(user_id.into_inner(), key)
            .await
            .map_err(storage)?;
        Ok(model.map(Transaction::from))
    }

    async fn query_journal(&self, query: &JournalQuery) -> LedgerResult<Vec<Transaction>> {
        let ids: Vec<_> = query.account_ids.iter().map(|id| id.into_inner()).collect();
        let before = query.before.map(|cursor| JournalKeyset {
            created_at: cursor.created_at.into(),
            id: cursor.id.into_inner(),
        });
        let models = self
            .transactions
            .list_for_accounts(&ids, query.limit, query.offset, before)
            .await
            .map_err(storage)?;
        Ok(models.into_iter().map(Transaction::from).collect())
    }

    async fn count_journal(&self, account_ids: &[AccountId]) -> LedgerResult<u64> {
        let ids: Vec<_> = account_ids.iter().map(|id| id.into_inner()).collect();
        self.transactions
            .count_for_accounts(&ids)
            .await
            .map_err(storage)
    }

    async fn begin(&self) -> LedgerResult<Box<dyn LedgerUnitOfWork>> {
        let txn = self.db.begin().await.map_err(storage)?;
        Ok(Box::new(PgUnitOfWork {
            txn,
            accounts: self.accounts.clone(),
            transactions: self.transactions.clone(),
            locked: BTreeMap::new(),
        }))
    }

    async fn ping(&self) -> LedgerResult<()> {
        self.db.ping().await.map_err(storage)
    }

    async fn close(&self) -> LedgerResult<()> {
        self.db.clone().close().await.map_err(storage)
    }
}

/// Unit of work over one PostgreSQL transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    locked: BTreeMap<AccountId, Account>,
}

#[async_trait]
impl LedgerUnitOfWork for PgUnitOfWork {
    async fn lock_accounts(&mut self, ids: &[AccountId]) -> LedgerResult<Vec<Account>> {
        if !self.locked.is_empty() {
            return Err(LedgerError::Internal(
                "accounts already locked in this unit of work".to_string(),
            ));
        }

        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        for id in ordered {
            if let Some(model) = self
                .accounts
                .lock_for_update(&self.txn, id.into_inner())
                .await
                .map_err(storage)?
            {
                self.locked.insert(id, Account::from(model));
            }
        }

        Ok(self.locked.values().cloned().collect())
    }

    async fn adjust_balance(&mut self, account_id: AccountId, delta: Money) -> LedgerResult<Account> {
        let account = self.locked.get_mut(&account_id).ok_or_else(|| {
            LedgerError::Internal(format!("account {account_id} is not locked"))
        })?;

        let balance = account.balance_after(delta)?;
        self.accounts
            .update_balance(
                &self.txn,
                account_id.into_inner(),
                account.version,
                balance.amount(),
            )
            .await
            .map_err(|err| match err {
                AccountError::VersionConflict { .. } => {
                    LedgerError::ConcurrentModification(account_id)
                }
                AccountError::Database(db) => storage(db),
            })?;

        account.balance = balance;
        account.version += 1;
        Ok(account.clone())
    }

    async fn append(&mut self, transaction: &Transaction) -> LedgerResult<()> {
        self.transactions
            .insert(&self.txn, transaction)
            .await
            .map_err(|err| match err {
                TransactionError::DuplicateIdempotencyKey(key) => {
                    LedgerError::DuplicateIdempotencyKey(key)
                }
                TransactionError::Database(db) => storage(db),
            })?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        self.txn.commit().await.map_err(|err| {
            warn!(error = %err, "Ledger commit failed");
            storage(err)
        })
    }

    async fn rollback(self: Box<Self>) -> LedgerResult<()> {
        self.txn.rollback().await.map_err(storage)
    }
}
