//! Results returned by settlement operations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    ContributionMode, Product, TransactionKind,
    gateway::{PaymentPurpose, Receipt},
    gateway_references::MarkerStatus,
    rules::{Resolution, RuleState},
};

/// A committed contribution (wallet-funded or reconciled).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionOutcome {
    pub contribution_id: Uuid,
    pub transaction_id: Uuid,
    pub amount_minor: i64,
    pub resolution: Resolution,
    pub wallet_balance_minor: i64,
    pub ica_balance_minor: i64,
    pub piggy_balance_minor: i64,
}

/// Handle of a gateway payment waiting for verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitialization {
    pub transaction_id: Uuid,
    pub authorization_url: String,
    pub reference: String,
    pub access_code: Option<String>,
    pub purpose: PaymentPurpose,
    /// Pre-lock resolution of the requested product, for contributions.
    pub resolution: Option<Resolution>,
}

/// Result of reconciling a gateway reference.
///
/// `replayed` is `true` when the reference had already been processed: the
/// values then describe the first attempt and nothing was mutated. A replay
/// of an `unmatched` reference never moves money.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub reference: String,
    pub account_id: String,
    pub purpose: PaymentPurpose,
    pub product: Option<Product>,
    pub amount_minor: i64,
    pub status: MarkerStatus,
    pub replayed: bool,
    pub resolution: Option<Resolution>,
    pub receipt: Receipt,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub sent_transaction_id: Uuid,
    pub received_transaction_id: Uuid,
    pub sent_kind: TransactionKind,
    pub received_kind: TransactionKind,
    pub recipient_id: String,
    pub recipient_name: String,
    pub amount_minor: i64,
    pub wallet_balance_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiggyWithdrawalOutcome {
    pub transaction_id: Uuid,
    pub amount_minor: i64,
    pub wallet_balance_minor: i64,
    pub piggy_balance_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutOutcome {
    pub transaction_id: Uuid,
    pub kind: TransactionKind,
    pub reference: String,
    pub gateway_status: String,
    pub amount_minor: i64,
    pub wallet_balance_minor: i64,
}

/// Read-only projection of the rule resolver for one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionInfo {
    pub contribution_mode: ContributionMode,
    pub mode_description: String,
    pub monthly_count: u64,
    pub ica_only_limit: u32,
    pub state: RuleState,
    pub allowed_products: Vec<Product>,
}

/// State of the monthly fee batch after a trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeeBatchOutcome {
    /// The trigger date is not the first day of a month.
    NotDue,
    /// Another run holds the batch.
    AlreadyRunning,
    Completed(FeeBatchReport),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBatchReport {
    pub run_date: Option<NaiveDate>,
    pub base_year: i32,
    pub base_month: u32,
    pub rate_bps: u32,
    pub eligible: usize,
    pub applied: usize,
    pub insufficient: usize,
    /// Already charged this month, or a zero fee after rounding.
    pub skipped: usize,
    /// Accounts whose unit of work failed for another reason.
    pub errored: usize,
    pub total_fees_minor: i64,
}
