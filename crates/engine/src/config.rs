//! Engine tunables, handed to [`crate::Engine::builder`].

use serde::Deserialize;

use crate::{Currency, rules::DEFAULT_ICA_ONLY_LIMIT};

/// Description written on every monthly fee contribution. The fee batch uses
/// it to recognise a deduction it already made this month.
pub const MONTHLY_FEE_DESCRIPTION: &str = "Monthly contribution fee deduction";

/// 2% of the previous month's ICA and Piggy contributions.
pub const DEFAULT_MONTHLY_FEE_RATE_BPS: u32 = 200;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Operator/reserve account credited by ICA contributions and fees.
    pub reserve_account_id: String,
    /// Size of the monthly ICA-only window.
    pub ica_only_limit: u32,
    /// Monthly fee rate in basis points (200 = 2%). Zero falls back to
    /// [`DEFAULT_MONTHLY_FEE_RATE_BPS`].
    pub monthly_fee_rate_bps: u32,
    pub currency: Currency,
    pub public_id_secret: String,
    pub public_id_prefix: String,
    /// Domain used to build a payer identity for accounts without an email.
    pub payer_domain: String,
    /// Frontend base URL the gateway redirects back to.
    pub callback_base_url: String,
    /// bcrypt work factor for new password hashes.
    pub password_hash_cost: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reserve_account_id: "admin".to_string(),
            ica_only_limit: DEFAULT_ICA_ONLY_LIMIT,
            monthly_fee_rate_bps: DEFAULT_MONTHLY_FEE_RATE_BPS,
            currency: Currency::Ngn,
            public_id_secret: "dewbox-public-id-fallback-secret".to_string(),
            public_id_prefix: "MDBX".to_string(),
            payer_domain: "mydewbox.app".to_string(),
            callback_base_url: "http://localhost:5173".to_string(),
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}
