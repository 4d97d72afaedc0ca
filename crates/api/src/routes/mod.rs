//! API route definitions.

use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, middleware};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{AppState, middleware::auth::auth_middleware};
use ledgerline_core::ledger::{LedgerError, Receipt, TransactionKind, TransactionStatus};
use ledgerline_shared::types::{AccountId, Money, TransactionId};

pub mod accounts;
pub mod health;
pub mod payments;
pub mod recipients;
pub mod transactions;
pub mod transfers;

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(accounts::routes())
        .merge(transactions::routes())
        .merge(transfers::routes())
        .merge(payments::routes())
        .merge(recipients::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Reads the optional `Idempotency-Key` header.
pub(crate) fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, LedgerError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value.to_str().map(str::to_string).map_err(|_| {
                LedgerError::InvalidIdempotencyKey("key must be printable ASCII".to_string())
            })
        })
        .transpose()
}

/// Response for a committed money movement.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub transaction_id: TransactionId,
    /// Kind of movement.
    pub kind: TransactionKind,
    /// Status.
    pub status: TransactionStatus,
    /// Amount actually moved.
    pub amount: Money,
    /// Debited account, if any.
    pub source_account_id: Option<AccountId>,
    /// Credited account, if any.
    pub destination_account_id: Option<AccountId>,
    /// Whether this is the result of an earlier request with the same key.
    pub replayed: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<Receipt> for TransactionResponse {
    fn from(receipt: Receipt) -> Self {
        let tx = receipt.transaction;
        Self {
            transaction_id: tx.id,
            kind: tx.kind,
            status: tx.status,
            amount: tx.amount,
            source_account_id: tx.source_account_id,
            destination_account_id: tx.destination_account_id,
            replayed: receipt.replayed,
            created_at: tx.created_at,
        }
    }
}

/// 201 for a fresh movement, 200 when replayed.
pub(crate) fn created_or_replayed(receipt: Receipt) -> (StatusCode, Json<TransactionResponse>) {
    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    (status, Json(TransactionResponse::from(receipt)))
}
