use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use rate_limit::{RateLimitConfig, RateLimiter, RateLimits};
pub use server::{AuthAccount, ServerState, router, run_with_listener};

mod accounts;
mod contributions;
mod mapping;
mod rate_limit;
mod server;
mod transactions;
mod webhooks;

pub mod types {
    pub mod account {
        pub use api_types::account::AccountView;
    }

    pub mod contribution {
        pub use api_types::contribution::{
            ContributionCreated, ContributionHistoryResponse, ContributionInfo, ContributionMode,
            ContributionNew, ContributionSettings, ContributionView, FundingSource,
            PiggyWithdraw, PiggyWithdrawn, Product, ResolutionView,
        };
    }

    pub mod payment {
        pub use api_types::payment::{
            FundNew, PaymentPurpose, PaymentStarted, PaymentVerified, ReceiptView,
            ReferenceStatus, WebhookAck, WebhookData, WebhookEvent,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            PayoutCompleted, PayoutKind, TransactionKind, TransactionListQuery,
            TransactionListResponse, TransactionStatus, TransactionView, WalletSendNew,
            WalletSent, WithdrawNew,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) | EngineError::RecipientNotFound => StatusCode::NOT_FOUND,
        EngineError::NoMatchingPendingTransaction(_) => StatusCode::CONFLICT,
        EngineError::GatewayUnavailable(_) | EngineError::GatewayRejected(_) => {
            StatusCode::BAD_GATEWAY
        }
        EngineError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidProduct(_)
        | EngineError::InvalidInput(_)
        | EngineError::InsufficientBalance
        | EngineError::InsufficientPiggyBalance
        | EngineError::SelfTransferNotAllowed => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Balance and validation errors are reported as is. Gateway and
/// reconciliation failures get a generic retry hint: the payment may still
/// settle on the gateway side.
fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::GatewayUnavailable(detail) | EngineError::GatewayTimeout(detail) => {
            tracing::warn!("payment gateway failure: {detail}");
            "payment service unavailable, please retry verification later".to_string()
        }
        EngineError::NoMatchingPendingTransaction(reference) => {
            format!("payment {reference} could not be matched, please contact support")
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
