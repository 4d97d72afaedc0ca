//! `SeaORM` Entity for accounts table.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use ledgerline_core::ledger::Account;
use ledgerline_shared::types::Money;

use super::sea_orm_active_enums::AccountType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub account_number: String,
    pub account_type: AccountType,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub credit_limit: Decimal,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            id: model.id.into(),
            user_id: model.user_id.into(),
            account_number: model.account_number,
            account_type: model.account_type.into(),
            balance: Money::from_decimal(model.balance),
            credit_limit: Money::from_decimal(model.credit_limit),
            version: model.version,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: sea_orm::Set(account.id.into_inner()),
            user_id: sea_orm::Set(account.user_id.into_inner()),
            account_number: sea_orm::Set(account.account_number.clone()),
            account_type: sea_orm::Set(account.account_type.into()),
            balance: sea_orm::Set(account.balance.amount()),
            credit_limit: sea_orm::Set(account.credit_limit.amount()),
            version: sea_orm::Set(account.version),
            created_at: sea_orm::Set(account.created_at.into()),
            updated_at: sea_orm::Set(account.created_at.into()),
        }
    }
}
