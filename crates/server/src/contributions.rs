//! Contributions API endpoints

use api_types::{
    account::AccountView,
    contribution::{
        ContributionCreated, ContributionHistoryResponse, ContributionInfo, ContributionNew,
        ContributionSettings, FundingSource, PiggyWithdraw, PiggyWithdrawn,
    },
    payment::{PaymentStarted, PaymentVerified},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use engine::{
    InitializePaymentCmd, PiggyWithdrawalCmd, ReconcileCmd, WalletContributionCmd,
    gateway::PaymentPurpose,
};

use crate::{
    ServerError, mapping,
    server::{AuthAccount, ServerState},
};

/// Wallet-funded contributions settle immediately (201); gateway-funded
/// ones return the hosted checkout to redirect to (202).
pub async fn create(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<ContributionNew>,
) -> Result<Response, ServerError> {
    let now = Utc::now();
    match payload.source {
        FundingSource::Wallet => {
            let mut cmd = WalletContributionCmd::new(&account_id, payload.amount_minor, now);
            cmd.product = payload.product;
            cmd.description = payload.description;
            let outcome = state.engine.contribute_from_wallet(cmd).await?;
            let body = ContributionCreated {
                contribution_id: outcome.contribution_id,
                transaction_id: outcome.transaction_id,
                amount_minor: outcome.amount_minor,
                resolution: mapping::resolution(outcome.resolution),
                wallet_balance_minor: outcome.wallet_balance_minor,
                ica_balance_minor: outcome.ica_balance_minor,
                piggy_balance_minor: outcome.piggy_balance_minor,
            };
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        FundingSource::Gateway => {
            let mut cmd = InitializePaymentCmd::new(
                &account_id,
                payload.amount_minor,
                PaymentPurpose::Contribution,
                now,
            );
            cmd.product = payload.product;
            cmd.description = payload.description;
            let started = state.engine.initialize_payment(cmd).await?;
            let body = PaymentStarted {
                transaction_id: started.transaction_id,
                authorization_url: started.authorization_url,
                reference: started.reference,
                access_code: started.access_code,
                purpose: mapping::purpose(started.purpose),
                resolution: started.resolution.map(mapping::resolution),
            };
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
    }
}

pub async fn info(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
) -> Result<Json<ContributionInfo>, ServerError> {
    let info = state
        .engine
        .contribution_info(&account_id, Utc::now())
        .await?;
    Ok(Json(ContributionInfo {
        contribution_mode: mapping::mode(info.contribution_mode),
        mode_description: info.mode_description,
        monthly_count: info.monthly_count,
        ica_only_limit: info.ica_only_limit,
        ica_only_window_active: info.state.ica_only_window_active,
        remaining_ica_only: info.state.remaining_ica_only,
        allow_piggy: info.state.allow_piggy,
        default_product: mapping::product(info.state.default_product),
        allowed_products: info
            .allowed_products
            .into_iter()
            .map(mapping::product)
            .collect(),
    }))
}

pub async fn history(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
) -> Result<Json<ContributionHistoryResponse>, ServerError> {
    let contributions = state.engine.list_contributions(&account_id).await?;
    Ok(Json(ContributionHistoryResponse {
        contributions: contributions
            .into_iter()
            .map(mapping::contribution)
            .collect(),
    }))
}

pub async fn settings(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<ContributionSettings>,
) -> Result<Json<AccountView>, ServerError> {
    let summary = state
        .engine
        .set_contribution_mode(&account_id, mapping::engine_mode(payload.contribution_mode))
        .await?;
    Ok(Json(mapping::account(summary)))
}

/// Verifies a gateway reference of the authenticated member.
pub async fn verify(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> Result<Json<PaymentVerified>, ServerError> {
    let outcome = state
        .engine
        .reconcile(ReconcileCmd::new(reference, Utc::now()).caller(account_id))
        .await?;
    Ok(Json(mapping::verified(outcome)))
}

pub async fn piggy_withdraw(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<PiggyWithdraw>,
) -> Result<Json<PiggyWithdrawn>, ServerError> {
    let outcome = state
        .engine
        .withdraw_from_piggy(PiggyWithdrawalCmd::new(
            &account_id,
            payload.amount_minor,
            Utc::now(),
        ))
        .await?;
    Ok(Json(PiggyWithdrawn {
        transaction_id: outcome.transaction_id,
        amount_minor: outcome.amount_minor,
        wallet_balance_minor: outcome.wallet_balance_minor,
        piggy_balance_minor: outcome.piggy_balance_minor,
    }))
}
