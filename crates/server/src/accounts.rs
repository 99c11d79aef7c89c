//! Account API endpoints

use api_types::account::AccountView;
use axum::{Extension, Json, extract::State};

use crate::{
    ServerError, mapping,
    server::{AuthAccount, ServerState},
};

/// Balances and public wallet id of the authenticated member.
pub async fn me(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
) -> Result<Json<AccountView>, ServerError> {
    let summary = state.engine.account_summary(&account_id).await?;
    Ok(Json(mapping::account(summary)))
}
