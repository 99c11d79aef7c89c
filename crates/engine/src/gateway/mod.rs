//! External payment gateway.
//!
//! The engine consumes the gateway through three narrow operations:
//! *initialize* a hosted payment, *verify* a payment by reference and *payout*
//! to a bank account. [`PaymentGateway`] is the seam; [`HttpGateway`] talks to
//! a Paystack-compatible HTTP API and tests plug in scripted fakes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EngineError, Product};

mod http;
mod receipt;

pub use http::{HttpGateway, HttpGatewayConfig};
pub use receipt::Receipt;

/// Why money is being collected through the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    /// Wallet funding.
    Deposit,
    /// One-off subscription fee.
    Fee,
    /// Contribution into a savings product.
    Contribution,
}

impl PaymentPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Fee => "fee",
            Self::Contribution => "contribution",
        }
    }
}

impl TryFrom<&str> for PaymentPurpose {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(Self::Deposit),
            "fee" => Ok(Self::Fee),
            "contribution" => Ok(Self::Contribution),
            other => Err(EngineError::InvalidInput(format!(
                "invalid payment purpose: {other}"
            ))),
        }
    }
}

/// Opaque tag attached to a gateway payment. It must come back untouched from
/// *verify*: it is the only link between a reference and an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTag {
    pub account_id: String,
    pub purpose: PaymentPurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitializeRequest {
    pub amount_minor: i64,
    pub payer_identity: String,
    pub callback_url: String,
    pub tag: PaymentTag,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedPayment {
    pub authorization_url: String,
    pub reference: String,
    pub access_code: Option<String>,
}

/// Gateway view of a payment, as returned by *verify*.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub reference: String,
    /// `true` only when the gateway reports the payment as successful.
    pub success: bool,
    pub status: String,
    pub amount_minor: i64,
    pub requested_amount_minor: Option<i64>,
    pub fees_minor: Option<i64>,
    pub currency: Option<String>,
    pub payer_identity: Option<String>,
    pub tag: Option<PaymentTag>,
    pub channel: Option<String>,
    pub gateway_response: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub gateway_transaction_id: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_bank: Option<String>,
    pub sender_account_number: Option<String>,
    pub narration: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_number: String,
    pub bank_code: String,
    pub account_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutRequest {
    pub amount_minor: i64,
    pub destination: BankDetails,
    pub reason: String,
    pub reference: String,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutResult {
    pub success: bool,
    pub reference: String,
    pub status: String,
    pub message: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway is not configured")]
    NotConfigured,
    #[error("gateway unreachable: {0}")]
    Unavailable(String),
    #[error("gateway timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Rejected(String),
}

impl From<GatewayError> for EngineError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::NotConfigured => {
                EngineError::GatewayUnavailable("payment service not configured".to_string())
            }
            GatewayError::Unavailable(msg) => EngineError::GatewayUnavailable(msg),
            GatewayError::Timeout(msg) => EngineError::GatewayTimeout(msg),
            GatewayError::Rejected(msg) => EngineError::GatewayRejected(msg),
        }
    }
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    async fn initialize(&self, request: InitializeRequest)
    -> Result<InitializedPayment, GatewayError>;

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError>;

    async fn payout(&self, request: PayoutRequest) -> Result<PayoutResult, GatewayError>;
}

/// Gateway of processes that never talk to the payment provider (the admin
/// CLI, for example). Every call fails with [`GatewayError::NotConfigured`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledGateway;

#[async_trait::async_trait]
impl PaymentGateway for DisabledGateway {
    async fn initialize(&self, _: InitializeRequest) -> Result<InitializedPayment, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn verify(&self, _: &str) -> Result<VerifiedPayment, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn payout(&self, _: PayoutRequest) -> Result<PayoutResult, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_json_metadata() {
        let tag = PaymentTag {
            account_id: "acc-1".to_string(),
            purpose: PaymentPurpose::Contribution,
            product: Some(Product::Piggy),
            description: None,
        };
        let mut metadata = serde_json::to_value(&tag).unwrap();
        metadata["custom_fields"] = serde_json::json!([{ "variable_name": "user_id" }]);
        let back: PaymentTag = serde_json::from_value(metadata).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn timeout_maps_to_retryable_engine_error() {
        let err = EngineError::from(GatewayError::Timeout("verify".to_string()));
        assert!(err.is_retryable());
        assert!(!EngineError::from(GatewayError::Rejected("no".to_string())).is_retryable());
    }
}
