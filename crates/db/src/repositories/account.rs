//! Account repository: reads, default provisioning and locked balance writes.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use ledgerline_core::ledger::{Account, DefaultAccounts};
use ledgerline_shared::types::UserId;

use crate::entities::accounts;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Row version no longer matches the one read under lock.
    #[error("Account {id} changed since version {expected}")]
    VersionConflict {
        /// Account ID.
        id: Uuid,
        /// Version the caller expected.
        expected: i64,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Account repository for ledger accounts.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists a user's accounts ordered by `(created_at, id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<accounts::Model>, DbErr> {
        Self::list_for_user_in(&self.db, user_id).await
    }

    async fn list_for_user_in<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<accounts::Model>, DbErr> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(conn)
            .await
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds every account among `ids` that exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<accounts::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
    }

    /// Inserts the default account set unless the user already has accounts.
    ///
    /// A transaction-scoped advisory lock keyed on the user id serializes
    /// concurrent first calls, so exactly one set is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database transaction fails.
    pub async fn provision_defaults(
        &self,
        user_id: UserId,
        defaults: &DefaultAccounts,
    ) -> Result<Vec<accounts::Model>, DbErr> {
        let txn = self.db.begin().await?;

        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtext($1))",
            [user_id.to_string().into()],
        ))
        .await?;

        let existing = Self::list_for_user_in(&txn, user_id.into_inner()).await?;
        if !existing.is_empty() {
            txn.commit().await?;
            return Ok(existing);
        }

        let mut created = Vec::with_capacity(2);
        for account in defaults.build(user_id) {
            let model: accounts::ActiveModel = (&account).into();
            created.push(model.insert(&txn).await?);
        }

        txn.commit().await?;
        debug!(user_id = %user_id, count = created.len(), "Provisioned default accounts");
        Ok(created)
    }

    /// Inserts a fully built account.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (for example a duplicate account number).
    pub async fn insert(&self, account: &Account) -> Result<accounts::Model, DbErr> {
        let model: accounts::ActiveModel = account.into();
        model.insert(&self.db).await
    }

    /// Locks one account row with `SELECT ... FOR UPDATE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn lock_for_update(
        &self,
        txn: &DatabaseTransaction,
        id: Uuid,
    ) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(id)
            .lock_exclusive()
            .one(txn)
            .await
    }

    /// Writes a new balance if the row is still at `expected_version`, bumping it.
    ///
    /// # Errors
    ///
    /// Returns `VersionConflict` if no row matched, or a database error.
    pub async fn update_balance(
        &self,
        txn: &DatabaseTransaction,
        id: Uuid,
        expected_version: i64,
        balance: Decimal,
    ) -> Result<(), AccountError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(balance))
            .col_expr(accounts::Column::Version, Expr::value(expected_version + 1))
            .col_expr(
                accounts::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .filter(accounts::Column::Id.eq(id))
            .filter(accounts::Column::Version.eq(expected_version))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AccountError::VersionConflict {
                id,
                expected: expected_version,
            });
        }
        Ok(())
    }
}
