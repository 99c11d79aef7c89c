use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Currency;

use super::VerifiedPayment;

/// Member-facing receipt of a verified gateway payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub gateway_transaction_id: Option<i64>,
    pub reference: String,
    pub status: String,
    pub amount_minor: i64,
    pub requested_amount_minor: Option<i64>,
    /// Gateway fees, capped per currency.
    pub fees_minor: Option<i64>,
    pub net_amount_minor: Option<i64>,
    pub currency: String,
    pub channel: Option<String>,
    pub gateway_response: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub customer_email: Option<String>,
    pub payment_type: Option<String>,
    pub sender_name: Option<String>,
    pub sender_bank: Option<String>,
    pub sender_account_number: Option<String>,
    pub narration: Option<String>,
}

impl Receipt {
    pub fn from_verified(
        verified: &VerifiedPayment,
        currency: Currency,
        payment_type: Option<&str>,
    ) -> Self {
        let fees_minor = verified
            .fees_minor
            .map(|fees| fees.min(currency.receipt_fee_cap_minor()));
        Self {
            gateway_transaction_id: verified.gateway_transaction_id,
            reference: verified.reference.clone(),
            status: verified.status.clone(),
            amount_minor: verified.amount_minor,
            requested_amount_minor: verified.requested_amount_minor,
            fees_minor,
            net_amount_minor: fees_minor.map(|fees| verified.amount_minor - fees),
            currency: verified
                .currency
                .clone()
                .unwrap_or_else(|| currency.code().to_string()),
            channel: verified.channel.clone(),
            gateway_response: verified.gateway_response.clone(),
            paid_at: verified.paid_at,
            created_at: verified.created_at,
            customer_email: verified.payer_identity.clone(),
            payment_type: payment_type.map(ToString::to_string).or_else(|| {
                verified
                    .tag
                    .as_ref()
                    .map(|tag| tag.purpose.as_str().to_string())
            }),
            sender_name: verified.sender_name.clone(),
            sender_bank: verified.sender_bank.clone(),
            sender_account_number: verified.sender_account_number.clone(),
            narration: verified.narration.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fees_are_capped_and_net_is_derived() {
        let verified = VerifiedPayment {
            reference: "ref-1".to_string(),
            success: true,
            status: "success".to_string(),
            amount_minor: 10_000_000,
            fees_minor: Some(150_000),
            ..Default::default()
        };
        let receipt = Receipt::from_verified(&verified, Currency::Ngn, Some("deposit"));
        assert_eq!(receipt.fees_minor, Some(100_000));
        assert_eq!(receipt.net_amount_minor, Some(9_900_000));
        assert_eq!(receipt.currency, "NGN");
        assert_eq!(receipt.payment_type.as_deref(), Some("deposit"));
    }

    #[test]
    fn missing_fees_leave_net_unknown() {
        let verified = VerifiedPayment {
            reference: "ref-2".to_string(),
            amount_minor: 500,
            ..Default::default()
        };
        let receipt = Receipt::from_verified(&verified, Currency::Ngn, None);
        assert_eq!(receipt.fees_minor, None);
        assert_eq!(receipt.net_amount_minor, None);
        assert_eq!(receipt.payment_type, None);
    }
}
