//! `SeaORM` Entity for transactions table.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use ledgerline_core::ledger::Transaction;
use ledgerline_shared::types::Money;

use super::sea_orm_active_enums::{TransactionKind, TransactionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source_account_id: Option<Uuid>,
    pub destination_account_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub initiated_by: Uuid,
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::SourceAccountId",
        to = "super::accounts::Column::Id"
    )]
    SourceAccount,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::DestinationAccountId",
        to = "super::accounts::Column::Id"
    )]
    DestinationAccount,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id.into(),
            source_account_id: model.source_account_id.map(Into::into),
            destination_account_id: model.destination_account_id.map(Into::into),
            amount: Money::from_decimal(model.amount),
            kind: model.kind.into(),
            status: model.status.into(),
            description: model.description,
            initiated_by: model.initiated_by.into(),
            idempotency_key: model.idempotency_key,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<&Transaction> for ActiveModel {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: sea_orm::Set(transaction.id.into_inner()),
            source_account_id: sea_orm::Set(transaction.source_account_id.map(|id| id.into_inner())),
            destination_account_id: sea_orm::Set(
                transaction.destination_account_id.map(|id| id.into_inner()),
            ),
            amount: sea_orm::Set(transaction.amount.amount()),
            kind: sea_orm::Set(transaction.kind.into()),
            status: sea_orm::Set(transaction.status.into()),
            description: sea_orm::Set(transaction.description.clone()),
            initiated_by: sea_orm::Set(transaction.initiated_by.into_inner()),
            idempotency_key: sea_orm::Set(transaction.idempotency_key.clone()),
            created_at: sea_orm::Set(transaction.created_at.into()),
        }
    }
}
