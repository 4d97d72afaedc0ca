//! Statement Reader: a user's journal view across all of their accounts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_shared::types::{AccountId, Money, PageRequest, PageResponse, TransactionId, UserId};

use super::account::AccountSummary;
use super::error::{LedgerError, LedgerResult};
use super::store::{JournalQuery, LedgerStore, StatementCursor};
use super::transaction::{Direction, Transaction, TransactionKind, TransactionStatus};

/// One journal entry as seen by a particular user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Transaction ID.
    pub id: TransactionId,
    /// Kind of movement.
    pub kind: TransactionKind,
    /// Status.
    pub status: TransactionStatus,
    /// Amount.
    pub amount: Money,
    /// Description.
    pub description: Option<String>,
    /// Debited account, if any.
    pub source_account_id: Option<AccountId>,
    /// Credited account, if any.
    pub destination_account_id: Option<AccountId>,
    /// Direction relative to the viewing user.
    pub direction: Direction,
    /// The other side of the movement; the destination for internal transfers.
    pub counterparty: Option<AccountSummary>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Reads paginated statements.
#[derive(Clone)]
pub struct StatementReader {
    store: Arc<dyn LedgerStore>,
    default_page_size: u64,
    max_page_size: u64,
}

impl StatementReader {
    /// Creates a reader with the given page size bounds.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, default_page_size: u64, max_page_size: u64) -> Self {
        Self {
            store,
            default_page_size,
            max_page_size,
        }
    }

    /// Returns one page of the user's statement, newest first.
    ///
    /// `before` is a cursor taken from a previous page's `next_cursor`; when
    /// set, only entries strictly older than it are returned. Users without
    /// accounts get an empty page.
    pub async fn statement(
        &self,
        user_id: UserId,
        page: PageRequest,
        before: Option<&str>,
    ) -> LedgerResult<PageResponse<StatementLine>> {
        let limit = page.limit_or(self.default_page_size, self.max_page_size);
        let offset = page.offset();
        let before = before
            .map(|raw| {
                StatementCursor::decode(raw).ok_or_else(|| LedgerError::InvalidCursor(raw.to_string()))
            })
            .transpose()?;

        let accounts = self.store.accounts_for_user(user_id).await?;
        if accounts.is_empty() {
            return Ok(PageResponse::new(Vec::new(), limit, offset, 0));
        }
        let own_ids: Vec<AccountId> = accounts.iter().map(|a| a.id).collect();

        let total = self.store.count_journal(&own_ids).await?;
        let mut rows = self
            .store
            .query_journal(&JournalQuery {
                account_ids: own_ids.clone(),
                limit: limit + 1,
                offset,
                before,
            })
            .await?;

        let has_more = rows.len() as u64 > limit;
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        let next_cursor = has_more
            .then(|| rows.last().map(|t| StatementCursor::after(t).encode()))
            .flatten();

        let mut summaries: HashMap<AccountId, AccountSummary> =
            accounts.iter().map(|a| (a.id, a.summary())).collect();
        let foreign: Vec<AccountId> = rows
            .iter()
            .flat_map(|t| [t.source_account_id, t.destination_account_id])
            .flatten()
            .filter(|id| !summaries.contains_key(id))
            .collect();
        if !foreign.is_empty() {
            for account in self.store.get_accounts(&foreign).await? {
                summaries.insert(account.id, account.summary());
            }
        }

        let lines = rows
            .into_iter()
            .map(|t| to_line(t, &own_ids, &summaries))
            .collect();

        Ok(PageResponse::new(lines, limit, offset, total).with_next_cursor(next_cursor))
    }
}

fn to_line(
    transaction: Transaction,
    own_ids: &[AccountId],
    summaries: &HashMap<AccountId, AccountSummary>,
) -> StatementLine {
    let direction = Direction::classify(&transaction, |id| own_ids.contains(&id));
    let counterparty_id = match direction {
        Direction::Incoming => transaction.source_account_id,
        Direction::Outgoing | Direction::Internal => transaction.destination_account_id,
    };

    StatementLine {
        id: transaction.id,
        kind: transaction.kind,
        status: transaction.status,
        amount: transaction.amount,
        description: transaction.description,
        source_account_id: transaction.source_account_id,
        destination_account_id: transaction.destination_account_id,
        direction,
        counterparty: counterparty_id.and_then(|id| summaries.get(&id).cloned()),
        created_at: transaction.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::{Account, AccountType, DefaultAccounts};
    use crate::ledger::engine::{CashRequest, TransferEngine, TransferRequest};
    use crate::ledger::memory::MemoryLedgerStore;
    use rust_decimal::Decimal;

    struct Fixture {
        store: MemoryLedgerStore,
        engine: TransferEngine,
        reader: StatementReader,
        user: UserId,
        checking: AccountId,
        savings: AccountId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryLedgerStore::new();
        let user = UserId::new();
        let accounts = store
            .provision_accounts(user, &DefaultAccounts::default())
            .await
            .unwrap();
        let shared: Arc<dyn LedgerStore> = Arc::new(store.clone());
        Fixture {
            engine: TransferEngine::new(Arc::clone(&shared), 255),
            reader: StatementReader::new(shared, 20, 100),
            store,
            user,
            checking: accounts[0].id,
            savings: accounts[1].id,
        }
    }

    async fn move_cents(f: &Fixture, cents: i64) -> TransactionId {
        f.engine
            .transfer(
                f.user,
                TransferRequest {
                    source_account_id: f.checking,
                    destination_account_id: f.savings,
                    amount: Decimal::new(cents, 2),
                    description: Some("move".into()),
                    idempotency_key: None,
                },
            )
            .await
            .unwrap()
            .transaction_id()
    }

    #[tokio::test]
    async fn test_empty_for_user_without_accounts() {
        let f = fixture().await;
        let page = f
            .reader
            .statement(UserId::new(), PageRequest::default(), None)
            .await
            .unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 0);
        assert_eq!(page.meta.limit, 20);
    }

    #[tokio::test]
    async fn test_internal_transfer_appears_once() {
        let f = fixture().await;
        let id = move_cents(&f, 250_00).await;

        let page = f.reader.statement(f.user, PageRequest::default(), None).await.unwrap();

        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data.len(), 1);
        let line = &page.data[0];
        assert_eq!(line.id, id);
        assert_eq!(line.kind, TransactionKind::Transfer);
        assert_eq!(line.status, TransactionStatus::Completed);
        assert_eq!(line.direction, Direction::Internal);
        assert_eq!(line.counterparty.as_ref().map(|c| c.id), Some(f.savings));
        assert_eq!(line.counterparty.as_ref().map(|c| c.account_type), Some(AccountType::Savings));
    }

    #[tokio::test]
    async fn test_newest_first_and_limit_clamp() {
        let f = fixture().await;
        let mut ids = Vec::new();
        for cents in 1..=5 {
            ids.push(move_cents(&f, cents).await);
        }

        let page = f.reader.statement(f.user, PageRequest::new(0, 0), None).await.unwrap();
        assert_eq!(page.meta.limit, 1);
        assert_eq!(page.data[0].id, ids[4]);

        let page = f.reader.statement(f.user, PageRequest::new(500, 0), None).await.unwrap();
        assert_eq!(page.meta.limit, 100);
        let listed: Vec<TransactionId> = page.data.iter().map(|l| l.id).collect();
        let expected: Vec<TransactionId> = ids.iter().rev().copied().collect();
        assert_eq!(listed, expected);
        assert!(page.meta.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_pagination_is_repeatable_and_new_entry_surfaces_first() {
        let f = fixture().await;
        for cents in 1..=3 {
            move_cents(&f, cents).await;
        }

        let first = f.reader.statement(f.user, PageRequest::new(2, 0), None).await.unwrap();
        let again = f.reader.statement(f.user, PageRequest::new(2, 0), None).await.unwrap();
        assert_eq!(first, again);

        let newest = move_cents(&f, 99).await;
        let after = f.reader.statement(f.user, PageRequest::new(2, 0), None).await.unwrap();
        assert_eq!(after.data[0].id, newest);
        assert_eq!(after.meta.total, 4);
    }

    #[tokio::test]
    async fn test_cursor_continues_without_overlap_under_appends() {
        let f = fixture().await;
        for cents in 1..=5 {
            move_cents(&f, cents).await;
        }

        let first = f.reader.statement(f.user, PageRequest::new(2, 0), None).await.unwrap();
        let cursor = first.meta.next_cursor.clone().unwrap();

        // concurrent append between pages must not shift the next page
        move_cents(&f, 77).await;

        let second = f
            .reader
            .statement(f.user, PageRequest::new(2, 0), Some(&cursor))
            .await
            .unwrap();
        let third_cursor = second.meta.next_cursor.clone().unwrap();
        let third = f
            .reader
            .statement(f.user, PageRequest::new(2, 0), Some(&third_cursor))
            .await
            .unwrap();

        let mut seen: Vec<TransactionId> = first.data.iter().map(|l| l.id).collect();
        seen.extend(second.data.iter().map(|l| l.id));
        seen.extend(third.data.iter().map(|l| l.id));
        assert_eq!(seen.len(), 5);
        seen.dedup();
        assert_eq!(seen.len(), 5);
        assert!(third.meta.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_invalid_cursor_rejected() {
        let f = fixture().await;
        let err = f
            .reader
            .statement(f.user, PageRequest::default(), Some("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn test_directions_for_payments_and_cash() {
        let f = fixture().await;
        let other_user = UserId::new();
        let theirs = Account::open(other_user, AccountType::Checking, Money::from_cents(100_00));
        f.store.insert_account(theirs.clone()).await;

        f.engine
            .deposit(
                f.user,
                CashRequest {
                    account_id: f.checking,
                    amount: Decimal::new(5_00, 2),
                    description: None,
                    idempotency_key: None,
                },
            )
            .await
            .unwrap();
        f.engine
            .peer_transfer(
                other_user,
                crate::ledger::engine::PeerTransferRequest {
                    source_account_id: theirs.id,
                    destination_account_id: f.checking,
                    recipient_user_id: f.user,
                    amount: Decimal::new(1_00, 2),
                    description: None,
                    idempotency_key: None,
                },
            )
            .await
            .unwrap();

        let page = f.reader.statement(f.user, PageRequest::default(), None).await.unwrap();
        assert_eq!(page.data.len(), 2);

        let payment = &page.data[0];
        assert_eq!(payment.kind, TransactionKind::Payment);
        assert_eq!(payment.direction, Direction::Incoming);
        assert_eq!(
            payment.counterparty.as_ref().map(|c| c.account_number.clone()),
            Some(theirs.account_number.clone())
        );

        let deposit = &page.data[1];
        assert_eq!(deposit.direction, Direction::Incoming);
        assert!(deposit.counterparty.is_none());

        let theirs_page = f.reader.statement(other_user, PageRequest::default(), None).await.unwrap();
        assert_eq!(theirs_page.data.len(), 1);
        assert_eq!(theirs_page.data[0].direction, Direction::Outgoing);
    }
}
