//! Account routes: listing plus external deposits and withdrawals.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{created_or_replayed, idempotency_key};
use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use ledgerline_core::ledger::{Account, AccountType, CashRequest};
use ledgerline_shared::types::{AccountId, Money};

/// Creates the account routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts/{account_id}/deposits", post(deposit))
        .route("/accounts/{account_id}/withdrawals", post(withdraw))
}

/// Response for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: AccountId,
    /// Display-facing account number.
    pub account_number: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Current balance.
    pub balance: Money,
    /// Credit limit; zero for checking and savings.
    pub credit_limit: Money,
    /// Balance plus remaining credit.
    pub available: Money,
    /// Opening time.
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            available: account.available_funds(),
            id: account.id,
            account_number: account.account_number,
            account_type: account.account_type,
            balance: account.balance,
            credit_limit: account.credit_limit,
            created_at: account.created_at,
        }
    }
}

/// Request body for a deposit or withdrawal.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CashMovementRequest {
    /// Amount as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// GET `/accounts` - List the caller's accounts, opening the default set on first use.
async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<AccountResponse>>> {
    let accounts = state.ledger.list_accounts(auth.user_id()).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// POST `/accounts/{account_id}/deposits`
async fn deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(account_id): Path<AccountId>,
    headers: HeaderMap,
    Json(body): Json<CashMovementRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = CashRequest {
        account_id,
        amount: body.amount,
        description: body.description,
        idempotency_key: idempotency_key(&headers)?,
    };
    let receipt = state.ledger.deposit(auth.user_id(), request).await?;
    Ok(created_or_replayed(receipt))
}

/// POST `/accounts/{account_id}/withdrawals`
async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(account_id): Path<AccountId>,
    headers: HeaderMap,
    Json(body): Json<CashMovementRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = CashRequest {
        account_id,
        amount: body.amount,
        description: body.description,
        idempotency_key: idempotency_key(&headers)?,
    };
    let receipt = state.ledger.withdraw(auth.user_id(), request).await?;
    Ok(created_or_replayed(receipt))
}
