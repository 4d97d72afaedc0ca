//! Recipient lookup route.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use ledgerline_core::ledger::Recipient;

/// Creates the recipient routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/recipients", get(resolve_recipient))
}

/// Query parameters for recipient lookup.
#[derive(Debug, Deserialize)]
pub struct RecipientQuery {
    /// Email address or username.
    pub identifier: String,
}

/// GET `/recipients?identifier=` - Resolve who a payment would reach.
async fn resolve_recipient(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<RecipientQuery>,
) -> ApiResult<Json<Recipient>> {
    let recipient = state.ledger.resolve_recipient(&query.identifier).await?;
    Ok(Json(recipient))
}
