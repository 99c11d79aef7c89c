use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ngn,
}

pub mod account {
    use super::*;
    use crate::contribution::ContributionMode;

    /// Balances of the authenticated member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: String,
        pub name: String,
        pub email: Option<String>,
        /// Public wallet id (`MDBX-XXXX-XXXX-XXXX`), shared to receive transfers.
        pub wallet_id: Option<String>,
        pub wallet_balance_minor: i64,
        pub ica_balance_minor: i64,
        pub piggy_balance_minor: i64,
        pub contribution_mode: ContributionMode,
        pub esusu_member: bool,
        pub created_at: DateTime<Utc>,
    }
}

pub mod contribution {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Product {
        Ica,
        Piggy,
        Esusu,
        Fee,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ContributionMode {
        Auto,
        AllIca,
    }

    /// Where the money of a contribution comes from.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FundingSource {
        /// Debit the member's wallet, settled immediately.
        #[default]
        Wallet,
        /// Hosted gateway checkout, settled on verification.
        Gateway,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionNew {
        /// Must be > 0.
        pub amount_minor: i64,
        /// `ICA`, `PIGGY` or `ESUSU`, case-insensitive. Absent lets the rules pick.
        pub product: Option<String>,
        pub description: Option<String>,
        #[serde(default)]
        pub source: FundingSource,
    }

    /// How the rules treated the requested product.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ResolutionView {
        pub requested: Option<Product>,
        pub resolved: Product,
        pub adjusted: bool,
        pub notice: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionCreated {
        pub contribution_id: Uuid,
        pub transaction_id: Uuid,
        pub amount_minor: i64,
        pub resolution: ResolutionView,
        pub wallet_balance_minor: i64,
        pub ica_balance_minor: i64,
        pub piggy_balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionInfo {
        pub contribution_mode: ContributionMode,
        pub mode_description: String,
        pub monthly_count: u64,
        pub ica_only_limit: u32,
        pub ica_only_window_active: bool,
        pub remaining_ica_only: u32,
        pub allow_piggy: bool,
        pub default_product: Product,
        pub allowed_products: Vec<Product>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionView {
        pub id: Uuid,
        pub product: Product,
        pub amount_minor: i64,
        pub year: i32,
        pub month: u32,
        pub contribution_date: NaiveDate,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionHistoryResponse {
        pub contributions: Vec<ContributionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionSettings {
        pub contribution_mode: ContributionMode,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PiggyWithdraw {
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PiggyWithdrawn {
        pub transaction_id: Uuid,
        pub amount_minor: i64,
        pub wallet_balance_minor: i64,
        pub piggy_balance_minor: i64,
    }
}

pub mod payment {
    use super::*;
    use crate::contribution::{Product, ResolutionView};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentPurpose {
        Deposit,
        Fee,
        Contribution,
    }

    /// Wallet funding or subscription fee through the gateway.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundNew {
        pub amount_minor: i64,
        /// `deposit` (default) or `fee`.
        pub purpose: Option<PaymentPurpose>,
    }

    /// Hosted checkout the client redirects the member to.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentStarted {
        pub transaction_id: Uuid,
        pub authorization_url: String,
        pub reference: String,
        pub access_code: Option<String>,
        pub purpose: PaymentPurpose,
        pub resolution: Option<ResolutionView>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ReferenceStatus {
        Settled,
        Unmatched,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptView {
        pub gateway_transaction_id: Option<i64>,
        pub reference: String,
        pub status: String,
        pub amount_minor: i64,
        pub requested_amount_minor: Option<i64>,
        pub fees_minor: Option<i64>,
        pub net_amount_minor: Option<i64>,
        pub currency: String,
        pub channel: Option<String>,
        pub paid_at: Option<DateTime<Utc>>,
        pub customer_email: Option<String>,
        pub payment_type: Option<String>,
        pub sender_name: Option<String>,
        pub sender_bank: Option<String>,
        pub narration: Option<String>,
    }

    /// Result of verifying a gateway reference.
    ///
    /// `replayed` is `true` when the reference had already been processed;
    /// nothing was applied by this call.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentVerified {
        pub reference: String,
        pub status: ReferenceStatus,
        pub replayed: bool,
        pub purpose: PaymentPurpose,
        pub product: Option<Product>,
        pub amount_minor: i64,
        pub resolution: Option<ResolutionView>,
        pub receipt: ReceiptView,
    }

    /// Gateway webhook body. Only `data.reference` is used: the payment is
    /// verified again with the gateway before anything is applied.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WebhookEvent {
        pub event: String,
        pub data: WebhookData,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WebhookData {
        pub reference: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WebhookAck {
        pub received: bool,
        pub status: Option<ReferenceStatus>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Contribution,
        Deposit,
        Fee,
        Withdrawal,
        Transfer,
        WalletTransferSent,
        WalletTransferReceived,
        MonthlyFee,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Pending,
        Completed,
        Failed,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayoutKind {
        /// To the member's own bank account.
        #[default]
        Withdrawal,
        /// To a third party's bank account.
        Transfer,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub currency: Currency,
        pub status: TransactionStatus,
        pub reference: Option<String>,
        pub note: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    /// Bank payout. The password is checked again before money leaves.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawNew {
        pub amount_minor: i64,
        pub account_number: String,
        pub bank_code: String,
        pub account_name: String,
        pub password: String,
        #[serde(default)]
        pub kind: PayoutKind,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayoutCompleted {
        pub transaction_id: Uuid,
        pub kind: TransactionKind,
        pub reference: String,
        pub gateway_status: String,
        pub amount_minor: i64,
        pub wallet_balance_minor: i64,
    }

    /// Wallet-to-wallet transfer.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletSendNew {
        /// Account id, member number, email or public wallet id.
        pub recipient: String,
        pub amount_minor: i64,
        pub password: String,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletSent {
        pub sent_transaction_id: Uuid,
        pub recipient_id: String,
        pub recipient_name: String,
        pub amount_minor: i64,
        pub wallet_balance_minor: i64,
    }
}
