//! `SeaORM` active enums mapped to PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use ledgerline_core::ledger::{
    AccountType as DomainAccountType, TransactionKind as DomainTransactionKind,
    TransactionStatus as DomainTransactionStatus,
};

/// `account_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    /// Checking account.
    #[sea_orm(string_value = "checking")]
    Checking,
    /// Savings account.
    #[sea_orm(string_value = "savings")]
    Savings,
    /// Credit line.
    #[sea_orm(string_value = "credit")]
    Credit,
}

/// `transaction_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
pub enum TransactionKind {
    /// External deposit.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// External withdrawal.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Own-account transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Person-to-person payment.
    #[sea_orm(string_value = "payment")]
    Payment,
}

/// `transaction_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    /// Not yet applied.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Applied.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Rejected.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Withdrawn.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<DomainAccountType> for AccountType {
    fn from(value: DomainAccountType) -> Self {
        match value {
            DomainAccountType::Checking => Self::Checking,
            DomainAccountType::Savings => Self::Savings,
            DomainAccountType::Credit => Self::Credit,
        }
    }
}

impl From<AccountType> for DomainAccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Checking => Self::Checking,
            AccountType::Savings => Self::Savings,
            AccountType::Credit => Self::Credit,
        }
    }
}

impl From<DomainTransactionKind> for TransactionKind {
    fn from(value: DomainTransactionKind) -> Self {
        match value {
            DomainTransactionKind::Deposit => Self::Deposit,
            DomainTransactionKind::Withdrawal => Self::Withdrawal,
            DomainTransactionKind::Transfer => Self::Transfer,
            DomainTransactionKind::Payment => Self::Payment,
        }
    }
}

impl From<TransactionKind> for DomainTransactionKind {
    fn from(value: TransactionKind) -> Self {
        match value {
            TransactionKind::Deposit => Self::Deposit,
            TransactionKind::Withdrawal => Self::Withdrawal,
            TransactionKind::Transfer => Self::Transfer,
            TransactionKind::Payment => Self::Payment,
        }
    }
}

impl From<DomainTransactionStatus> for TransactionStatus {
    fn from(value: DomainTransactionStatus) -> Self {
        match value {
            DomainTransactionStatus::Pending => Self::Pending,
            DomainTransactionStatus::Completed => Self::Completed,
            DomainTransactionStatus::Failed => Self::Failed,
            DomainTransactionStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<TransactionStatus> for DomainTransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Completed => Self::Completed,
            TransactionStatus::Failed => Self::Failed,
            TransactionStatus::Cancelled => Self::Cancelled,
        }
    }
}
