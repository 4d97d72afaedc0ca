//! Own-account transfer route.

use axum::{
    Json, Router, extract::State, http::HeaderMap, response::IntoResponse, routing::post,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{created_or_replayed, idempotency_key};
use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use ledgerline_core::ledger::TransferRequest;
use ledgerline_shared::types::AccountId;

/// Creates the transfer routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/transfers", post(create_transfer))
}

/// Request body for a transfer between two of the caller's accounts.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTransferRequest {
    /// Debited account.
    pub source_account_id: AccountId,
    /// Credited account.
    pub destination_account_id: AccountId,
    /// Amount as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// POST `/transfers`
async fn create_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(body): Json<CreateTransferRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = TransferRequest {
        source_account_id: body.source_account_id,
        destination_account_id: body.destination_account_id,
        amount: body.amount,
        description: body.description,
        idempotency_key: idempotency_key(&headers)?,
    };
    let receipt = state.ledger.transfer(auth.user_id(), request).await?;
    Ok(created_or_replayed(receipt))
}
