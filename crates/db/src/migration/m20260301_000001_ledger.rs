//! Ledger schema: users, accounts and the transaction journal.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: USERS (read-only to the ledger)
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 3: ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 4: TRANSACTION JOURNAL
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM ('checking', 'savings', 'credit');
CREATE TYPE transaction_kind AS ENUM ('deposit', 'withdrawal', 'transfer', 'payment');
CREATE TYPE transaction_status AS ENUM ('pending', 'completed', 'failed', 'cancelled');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id              UUID PRIMARY KEY,
    email           VARCHAR(254) NOT NULL,
    username        VARCHAR(64) NOT NULL UNIQUE,
    display_name    VARCHAR(255) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE UNIQUE INDEX idx_users_email_lower ON users (LOWER(email));
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id              UUID PRIMARY KEY,
    user_id         UUID NOT NULL,
    account_number  VARCHAR(12) NOT NULL UNIQUE,
    account_type    account_type NOT NULL,
    balance         NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit_limit    NUMERIC(19, 2) NOT NULL DEFAULT 0,
    version         BIGINT NOT NULL DEFAULT 0,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_accounts_credit_limit CHECK (credit_limit >= 0),
    CONSTRAINT chk_accounts_balance_floor CHECK (balance >= -credit_limit)
);

CREATE INDEX idx_accounts_user ON accounts (user_id, created_at, id);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id                      UUID PRIMARY KEY,
    source_account_id       UUID REFERENCES accounts(id),
    destination_account_id  UUID REFERENCES accounts(id),
    amount                  NUMERIC(19, 2) NOT NULL,
    kind                    transaction_kind NOT NULL,
    status                  transaction_status NOT NULL DEFAULT 'completed',
    description             TEXT,
    initiated_by            UUID NOT NULL,
    idempotency_key         VARCHAR(128),
    created_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_transactions_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_transactions_has_account
        CHECK (source_account_id IS NOT NULL OR destination_account_id IS NOT NULL),
    CONSTRAINT chk_transactions_distinct_accounts
        CHECK (source_account_id IS DISTINCT FROM destination_account_id)
);

CREATE UNIQUE INDEX uq_transactions_idempotency_key
    ON transactions (initiated_by, idempotency_key)
    WHERE idempotency_key IS NOT NULL;

CREATE INDEX idx_transactions_source
    ON transactions (source_account_id, created_at DESC, id DESC);

CREATE INDEX idx_transactions_destination
    ON transactions (destination_account_id, created_at DESC, id DESC);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS users CASCADE;

DROP TYPE IF EXISTS transaction_status CASCADE;
DROP TYPE IF EXISTS transaction_kind CASCADE;
DROP TYPE IF EXISTS account_type CASCADE;
";
