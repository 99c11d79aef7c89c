//! Transactions API endpoints

use api_types::{
    payment::{FundNew, PaymentPurpose as ApiPurpose, PaymentStarted, PaymentVerified},
    transaction::{
        PayoutCompleted, PayoutKind as ApiPayoutKind, TransactionListQuery,
        TransactionListResponse, WalletSendNew, WalletSent, WithdrawNew,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{
    BankPayoutCmd, InitializePaymentCmd, PayoutKind, ReconcileCmd, WalletTransferCmd,
    gateway::{BankDetails, PaymentPurpose},
};

use crate::{
    ServerError, mapping,
    server::{AuthAccount, ServerState},
};

pub async fn list(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let transactions = state
        .engine
        .list_transactions(&account_id, query.limit)
        .await?;
    Ok(Json(TransactionListResponse {
        transactions: transactions.into_iter().map(mapping::transaction).collect(),
    }))
}

/// Starts a wallet funding (or subscription fee) checkout.
pub async fn fund(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<FundNew>,
) -> Result<(StatusCode, Json<PaymentStarted>), ServerError> {
    let purpose = match payload.purpose.unwrap_or(ApiPurpose::Deposit) {
        ApiPurpose::Deposit => PaymentPurpose::Deposit,
        ApiPurpose::Fee => PaymentPurpose::Fee,
        ApiPurpose::Contribution => {
            return Err(ServerError::Generic(
                "contributions are started from /contributions".to_string(),
            ));
        }
    };
    let started = state
        .engine
        .initialize_payment(InitializePaymentCmd::new(
            &account_id,
            payload.amount_minor,
            purpose,
            Utc::now(),
        ))
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PaymentStarted {
            transaction_id: started.transaction_id,
            authorization_url: started.authorization_url,
            reference: started.reference,
            access_code: started.access_code,
            purpose: mapping::purpose(started.purpose),
            resolution: None,
        }),
    ))
}

/// Bank payout from the wallet.
pub async fn withdraw(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<WithdrawNew>,
) -> Result<(StatusCode, Json<PayoutCompleted>), ServerError> {
    let bank = BankDetails {
        account_number: payload.account_number,
        bank_code: payload.bank_code,
        account_name: payload.account_name,
    };
    let kind = match payload.kind {
        ApiPayoutKind::Withdrawal => PayoutKind::Withdrawal,
        ApiPayoutKind::Transfer => PayoutKind::Transfer,
    };
    let mut cmd = BankPayoutCmd::new(
        &account_id,
        payload.amount_minor,
        bank,
        payload.password,
        Utc::now(),
    )
    .kind(kind);
    cmd.note = payload.note;
    let outcome = state.engine.payout_to_bank(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(PayoutCompleted {
            transaction_id: outcome.transaction_id,
            kind: mapping::kind(outcome.kind),
            reference: outcome.reference,
            gateway_status: outcome.gateway_status,
            amount_minor: outcome.amount_minor,
            wallet_balance_minor: outcome.wallet_balance_minor,
        }),
    ))
}

/// Wallet-to-wallet transfer.
pub async fn wallet_send(
    Extension(AuthAccount(account_id)): Extension<AuthAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<WalletSendNew>,
) -> Result<(StatusCode, Json<WalletSent>), ServerError> {
    let mut cmd = WalletTransferCmd::new(
        &account_id,
        payload.recipient,
        payload.amount_minor,
        payload.password,
        Utc::now(),
    );
    cmd.note = payload.note;
    let outcome = state.engine.transfer_to_wallet(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(WalletSent {
            sent_transaction_id: outcome.sent_transaction_id,
            recipient_id: outcome.recipient_id,
            recipient_name: outcome.recipient_name,
            amount_minor: outcome.amount_minor,
            wallet_balance_minor: outcome.wallet_balance_minor,
        }),
    ))
}

/// Verifies a funding reference of the authenticated member.
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
