//! Statement route.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use ledgerline_core::ledger::StatementLine;
use ledgerline_shared::types::{PageRequest, PageResponse};

/// Creates the statement routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/transactions", get(list_transactions))
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementQuery {
    /// Page size (default 20, max 100).
    pub limit: Option<u64>,
    /// Entries to skip.
    pub offset: Option<u64>,
    /// `next_cursor` from a previous page.
    pub before: Option<String>,
}

/// GET `/transactions` - Newest-first statement across all the caller's accounts.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatementQuery>,
) -> ApiResult<Json<PageResponse<StatementLine>>> {
    let page = PageRequest {
        limit: query.limit,
        offset: query.offset,
    };
    let statement = state
        .ledger
        .statement(auth.user_id(), page, query.before.as_deref())
        .await?;
    Ok(Json(statement))
}
