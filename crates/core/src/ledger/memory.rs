//! In-process [`LedgerStore`] backed by tokio locks.
//!
//! Each account sits behind its own `Arc<Mutex<Account>>`. A unit of work
//! clones the arcs it needs and takes owned guards in ascending id order, so
//! two transfers touching the same account serialize on that account while
//! unrelated transfers proceed in parallel. Staged balances are written back
//! under the journal write lock at commit, which makes the journal entry and
//! the balance changes appear together. The guard excludes every other writer
//! for the life of the unit of work, so versions are bumped here but never
//! compared.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use ledgerline_shared::types::{AccountId, Money, UserId};

use super::account::{Account, DefaultAccounts};
use super::error::{LedgerError, LedgerResult};
use super::store::{JournalQuery, LedgerStore, LedgerUnitOfWork, RecipientLookup, UserProfile};
use super::transaction::Transaction;

/// Storage failure to inject into the next unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The next `append` fails.
    JournalAppend,
    /// The next `commit` fails before anything is applied.
    Commit,
}

#[derive(Default)]
struct AccountTable {
    by_id: BTreeMap<AccountId, Arc<Mutex<Account>>>,
    by_owner: HashMap<UserId, Vec<AccountId>>,
}

#[derive(Default)]
struct Journal {
    entries: Vec<Transaction>,
    by_key: HashMap<(UserId, String), usize>,
}

impl Journal {
    fn key_taken(&self, transaction: &Transaction) -> bool {
        transaction
            .idempotency_key
            .as_ref()
            .is_some_and(|key| self.by_key.contains_key(&(transaction.initiated_by, key.clone())))
    }

    fn push(&mut self, transaction: Transaction) {
        if let Some(key) = &transaction.idempotency_key {
            self.by_key
                .insert((transaction.initiated_by, key.clone()), self.entries.len());
        }
        self.entries.push(transaction);
    }
}

#[derive(Default)]
struct Inner {
    accounts: RwLock<AccountTable>,
    journal: RwLock<Journal>,
    users: RwLock<Vec<UserProfile>>,
    provisioning: Mutex<()>,
    fault: Mutex<Option<Fault>>,
    closed: AtomicBool,
}

impl Inner {
    fn ensure_open(&self) -> LedgerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LedgerError::Storage("store is closed".to_string()));
        }
        Ok(())
    }

    async fn take_fault(&self, wanted: Fault) -> bool {
        let mut fault = self.fault.lock().await;
        if *fault == Some(wanted) {
            *fault = None;
            return true;
        }
        false
    }

    async fn handles(&self, ids: &[AccountId]) -> Vec<Arc<Mutex<Account>>> {
        let table = self.accounts.read().await;
        ids.iter()
            .filter_map(|id| table.by_id.get(id).cloned())
            .collect()
    }

    async fn snapshot(&self, ids: &[AccountId]) -> Vec<Account> {
        let mut accounts = Vec::with_capacity(ids.len());
        for handle in self.handles(ids).await {
            accounts.push(handle.lock().await.clone());
        }
        accounts
    }

    async fn owned_by(&self, user_id: UserId) -> Vec<Account> {
        let ids = {
            let table = self.accounts.read().await;
            table.by_owner.get(&user_id).cloned().unwrap_or_default()
        };
        let mut accounts = self.snapshot(&ids).await;
        accounts.sort_by_key(|a| (a.created_at, a.id));
        accounts
    }
}

/// Thread-safe in-memory ledger store.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user profile so it can be found as a recipient.
    pub async fn insert_user(&self, profile: UserProfile) {
        let mut users = self.inner.users.write().await;
        users.retain(|u| u.id != profile.id);
        users.push(profile);
    }

    /// Inserts an account as-is, replacing any account with the same id.
    pub async fn insert_account(&self, account: Account) {
        let mut table = self.inner.accounts.write().await;
        let owners = table.by_owner.entry(account.user_id).or_default();
        if !owners.contains(&account.id) {
            owners.push(account.id);
        }
        table.by_id.insert(account.id, Arc::new(Mutex::new(account)));
    }

    /// Makes the next matching operation fail with a storage error.
    pub async fn inject_fault(&self, fault: Fault) {
        *self.inner.fault.lock().await = Some(fault);
    }

    /// Every journal entry in append order.
    pub async fn journal_entries(&self) -> Vec<Transaction> {
        self.inner.journal.read().await.entries.clone()
    }

    /// Every account, in id order.
    pub async fn all_accounts(&self) -> Vec<Account> {
        let ids: Vec<AccountId> = self.inner.accounts.read().await.by_id.keys().copied().collect();
        self.inner.snapshot(&ids).await
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn accounts_for_user(&self, user_id: UserId) -> LedgerResult<Vec<Account>> {
        self.inner.ensure_open()?;
        Ok(self.inner.owned_by(user_id).await)
    }

    async fn provision_accounts(
        &self,
        user_id: UserId,
        defaults: &DefaultAccounts,
    ) -> LedgerResult<Vec<Account>> {
        self.inner.ensure_open()?;
        let _guard = self.inner.provisioning.lock().await;

        let existing = self.inner.owned_by(user_id).await;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let created = defaults.build(user_id);
        for account in &created {
            self.insert_account(account.clone()).await;
        }
        debug!(user_id = %user_id, count = created.len(), "Provisioned default accounts");
        Ok(created)
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        self.inner.ensure_open()?;
        Ok(self.inner.snapshot(&[account_id]).await.into_iter().next())
    }

    async fn get_accounts(&self, ids: &[AccountId]) -> LedgerResult<Vec<Account>> {
        self.inner.ensure_open()?;
        Ok(self.inner.snapshot(ids).await)
    }

    async fn find_user(&self, lookup: &RecipientLookup) -> LedgerResult<Option<UserProfile>> {
        self.inner.ensure_open()?;
        let users = self.inner.users.read().await;
        Ok(users.iter().find(|u| lookup.matches(u)).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> LedgerResult<Option<Transaction>> {
        self.inner.ensure_open()?;
        let journal = self.inner.journal.read().await;
        Ok(journal
            .by_key
            .get(&(user_id, key.to_string()))
            .and_then(|&idx| journal.entries.get(idx))
            .cloned())
    }

    async fn query_journal(&self, query: &JournalQuery) -> LedgerResult<Vec<Transaction>> {
        self.inner.ensure_open()?;
        let wanted: HashSet<AccountId> = query.account_ids.iter().copied().collect();
        let journal = self.inner.journal.read().await;

        let mut matching: Vec<&Transaction> = journal
            .entries
            .iter()
            .filter(|t| {
                t.source_account_id.is_some_and(|id| wanted.contains(&id))
                    || t.destination_account_id.is_some_and(|id| wanted.contains(&id))
            })
            .filter(|t| query.before.is_none_or(|cursor| cursor.precedes(t)))
            .collect();
        matching.sort_by_key(|t| std::cmp::Reverse(t.ordering_key()));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count_journal(&self, account_ids: &[AccountId]) -> LedgerResult<u64> {
        self.inner.ensure_open()?;
        let journal = self.inner.journal.read().await;
        let count = journal
            .entries
            .iter()
            .filter(|t| account_ids.iter().any(|&id| t.touches(id)))
            .count();
        Ok(count as u64)
    }

    async fn begin(&self) -> LedgerResult<Box<dyn LedgerUnitOfWork>> {
        self.inner.ensure_open()?;
        Ok(Box::new(MemoryUnitOfWork {
            inner: Arc::clone(&self.inner),
            locked: BTreeMap::new(),
            pending: Vec::new(),
        }))
    }

    async fn ping(&self) -> LedgerResult<()> {
        self.inner.ensure_open()
    }

    async fn close(&self) -> LedgerResult<()> {
        self.inner.closed.store(true, Ordering::Release);
        debug!("Memory ledger store closed");
        Ok(())
    }
}

struct LockedAccount {
    guard: OwnedMutexGuard<Account>,
    staged: Account,
}

/// Unit of work over [`MemoryLedgerStore`].
///
/// Holds the owned account guards until commit or drop.
pub struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    locked: BTreeMap<AccountId, LockedAccount>,
    pending: Vec<Transaction>,
}

#[async_trait]
impl LedgerUnitOfWork for MemoryUnitOfWork {
    async fn lock_accounts(&mut self, ids: &[AccountId]) -> LedgerResult<Vec<Account>> {
        if !self.locked.is_empty() {
            return Err(LedgerError::Internal(
                "accounts already locked in this unit of work".to_string(),
            ));
        }

        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        for handle in self.inner.handles(&ordered).await {
            let guard = handle.lock_owned().await;
            let staged = guard.clone();
            self.locked.insert(
                staged.id,
                LockedAccount { guard, staged },
            );
        }

        Ok(self.locked.values().map(|l| l.staged.clone()).collect())
    }

    async fn adjust_balance(&mut self, account_id: AccountId, delta: Money) -> LedgerResult<Account> {
        let locked = self.locked.get_mut(&account_id).ok_or_else(|| {
            LedgerError::Internal(format!("account {account_id} is not locked"))
        })?;

        locked.staged.balance = locked.staged.balance_after(delta)?;
        locked.staged.version += 1;
        Ok(locked.staged.clone())
    }

    async fn append(&mut self, transaction: &Transaction) -> LedgerResult<()> {
        if self.inner.take_fault(Fault::JournalAppend).await {
            return Err(LedgerError::Storage("injected journal append failure".to_string()));
        }
        self.pending.push(transaction.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        let Self {
            inner,
            mut locked,
            pending,
        } = *self;

        if inner.take_fault(Fault::Commit).await {
            return Err(LedgerError::Storage("injected commit failure".to_string()));
        }
        inner.ensure_open()?;

        let mut journal = inner.journal.write().await;
        let mut seen = HashSet::new();
        for transaction in &pending {
            let duplicate_in_batch = transaction
                .idempotency_key
                .as_ref()
                .is_some_and(|key| !seen.insert((transaction.initiated_by, key.clone())));
            if duplicate_in_batch || journal.key_taken(transaction) {
                return Err(LedgerError::DuplicateIdempotencyKey(
                    transaction.idempotency_key.clone().unwrap_or_default(),
                ));
            }
        }

        for transaction in pending {
            journal.push(transaction);
        }
        for entry in locked.values_mut() {
            *entry.guard = entry.staged.clone();
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> LedgerResult<()> {
        Ok(())
    }
}
