//! Account ledger and money movement.
//!
//! This module implements:
//! - Account records and per-type balance rules
//! - The append-only transaction journal model
//! - The storage seam (`LedgerStore` / `LedgerUnitOfWork`) and an in-process store
//! - The Transfer Engine, Statement Reader and Recipient Resolver
//! - The `LedgerService` facade used by the API layer

pub mod account;
pub mod engine;
pub mod error;
pub mod memory;
pub mod recipient;
pub mod service;
pub mod statement;
pub mod store;
pub mod transaction;
pub mod validation;

#[cfg(test)]
mod engine_props;
#[cfg(test)]
mod validation_props;

pub use account::{Account, AccountSummary, AccountType, DefaultAccounts};
pub use engine::{CashRequest, PeerTransferRequest, Receipt, TransferEngine, TransferRequest};
pub use error::{ErrorCategory, LedgerError, LedgerResult};
pub use memory::{Fault, MemoryLedgerStore};
pub use recipient::{Recipient, RecipientResolver};
pub use service::{LedgerService, PaymentRequest};
pub use statement::{StatementLine, StatementReader};
pub use store::{
    JournalQuery, LedgerStore, LedgerUnitOfWork, RecipientLookup, StatementCursor, UserProfile,
};
pub use transaction::{Direction, Transaction, TransactionKind, TransactionStatus};
