//! Person-to-person payment route.

use axum::{
    Json, Router, extract::State, http::HeaderMap, response::IntoResponse, routing::post,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{created_or_replayed, idempotency_key};
use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use ledgerline_core::ledger::PaymentRequest;
use ledgerline_shared::types::AccountId;

/// Creates the payment routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/payments", post(send_payment))
}

/// Request body for a payment to another user.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendPaymentRequest {
    /// Debited account, owned by the caller.
    pub source_account_id: AccountId,
    /// Recipient email or username.
    pub recipient: String,
    /// Amount as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// POST `/payments`
async fn send_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(body): Json<SendPaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = PaymentRequest {
        source_account_id: body.source_account_id,
        recipient: body.recipient,
        amount: body.amount,
        description: body.description,
        idempotency_key: idempotency_key(&headers)?,
    };
    let receipt = state.ledger.send_payment(auth.user_id(), request).await?;
    Ok(created_or_replayed(receipt))
}
