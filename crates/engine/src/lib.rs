//! Settlement and balance-consistency engine of a savings cooperative.
//!
//! Members hold three balances (wallet, ICA, Piggy). The [`Engine`] moves
//! money between them, between members and to/from the payment gateway, each
//! movement being one database transaction that locks the affected account
//! rows in ascending id order and appends to the contribution and transaction
//! history.

pub use accounts::{AccountSummary, ContributionMode};
pub use commands::{
    BankPayoutCmd, InitializePaymentCmd, NewAccountCmd, PayoutKind, PiggyWithdrawalCmd,
    ReconcileCmd, WalletContributionCmd, WalletTransferCmd,
};
pub use config::{DEFAULT_MONTHLY_FEE_RATE_BPS, EngineConfig, MONTHLY_FEE_DESCRIPTION};
pub use contributions::{Contribution, Product};
pub use currency::Currency;
pub use error::EngineError;
pub use gateway_references::MarkerStatus;
pub use money::Money;
pub use ops::{
    DEFAULT_TRANSACTION_LIMIT, Engine, EngineBuilder, FeeAssessment, assess_monthly_fees,
};
pub use outcomes::{
    ContributionInfo, ContributionOutcome, FeeBatchOutcome, FeeBatchReport,
    PaymentInitialization, PayoutOutcome, PiggyWithdrawalOutcome, ReconcileOutcome,
    TransferOutcome,
};
pub use rules::{ContributionRules, DEFAULT_ICA_ONLY_LIMIT, Resolution, RuleState};
pub use transactions::{Transaction, TransactionKind, TransactionStatus};

mod accounts;
mod commands;
mod config;
mod contributions;
mod currency;
mod error;
pub mod gateway;
mod gateway_references;
mod money;
mod ops;
mod outcomes;
pub mod public_id;
pub mod rules;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
