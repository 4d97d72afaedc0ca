//! Transaction journal repository.

use chrono::{DateTime, FixedOffset};
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use uuid::Uuid;

use ledgerline_core::ledger::Transaction;

use crate::entities::transactions;

/// Name of the partial unique index on `(initiated_by, idempotency_key)`.
pub const IDEMPOTENCY_INDEX: &str = "uq_transactions_idempotency_key";

/// Error types for journal operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The initiator already committed a transaction with this key.
    #[error("Duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Keyset position: rows strictly older than `(created_at, id)`.
#[derive(Debug, Clone, Copy)]
pub struct JournalKeyset {
    /// Creation time of the last row seen.
    pub created_at: DateTime<FixedOffset>,
    /// Id of the last row seen.
    pub id: Uuid,
}

/// Transaction repository for the append-only journal.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a journal row inside `txn`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdempotencyKey` when the partial unique index rejects
    /// the row, or a database error.
    pub async fn insert(
        &self,
        txn: &DatabaseTransaction,
        transaction: &Transaction,
    ) -> Result<transactions::Model, TransactionError> {
        let model: transactions::ActiveModel = transaction.into();
        model.insert(txn).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) if message.contains(IDEMPOTENCY_INDEX) => {
                TransactionError::DuplicateIdempotencyKey(
                    transaction.idempotency_key.clone().unwrap_or_default(),
                )
            }
            _ => TransactionError::Database(err),
        })
    }

    /// Finds the transaction `initiated_by` committed with `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_idempotency_key(
        &self,
        initiated_by: Uuid,
        key: &str,
    ) -> Result<Option<transactions::Model>, DbErr> {
        transactions::Entity::find()
            .filter(transactions::Column::InitiatedBy.eq(initiated_by))
            .filter(transactions::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await
    }

    /// Lists rows touching any of `account_ids`, newest first.
    ///
    /// A row whose source and destination are both in the set is returned once.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_accounts(
        &self,
        account_ids: &[Uuid],
        limit: u64,
        offset: u64,
        before: Option<JournalKeyset>,
    ) -> Result<Vec<transactions::Model>, DbErr> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = transactions::Entity::find().filter(touching(account_ids));
        if let Some(keyset) = before {
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::CreatedAt.lt(keyset.created_at))
                    .add(
                        Condition::all()
                            .add(transactions::Column::CreatedAt.eq(keyset.created_at))
                            .add(transactions::Column::Id.lt(keyset.id)),
                    ),
            );
        }

        query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
    }

    /// Counts rows touching any of `account_ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_for_accounts(&self, account_ids: &[Uuid]) -> Result<u64, DbErr> {
        if account_ids.is_empty() {
            return Ok(0);
        }
        transactions::Entity::find()
            .filter(touching(account_ids))
            .count(&self.db)
            .await
    }
}

fn touching(account_ids: &[Uuid]) -> Condition {
    Condition::any()
        .add(transactions::Column::SourceAccountId.is_in(account_ids.iter().copied()))
        .add(transactions::Column::DestinationAccountId.is_in(account_ids.iter().copied()))
}
