//! Core business logic for Ledgerline.
//!
//! This crate contains the ledger domain with ZERO web or database dependencies.
//! Account rules, validation, the transfer engine and the storage seam live here;
//! concrete database stores implement [`ledger::LedgerStore`] in `ledgerline-db`.
//!
//! # Modules
//!
//! - `ledger` - Accounts, journal, transfers, statements and recipient lookup

pub mod ledger;
