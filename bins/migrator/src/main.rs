//! Database migration runner for Ledgerline.
//!
//! Usage:
//!   migrator up      - Create the ledger schema
//!   migrator down    - Drop it again
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop everything and re-run migrations
//!
//! Reads `DATABASE_URL` (a `.env` file is honoured).

use ledgerline_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
