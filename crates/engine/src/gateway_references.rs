//! Idempotency markers for gateway payment references.
//!
//! One row per reference, inserted through the primary-key constraint. The
//! marker is written in the same unit of work as the balance mutation it
//! guards, so a crash before commit leaves neither behind. It also stores the
//! outcome so a replay can answer without touching balances.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    /// Balances were mutated and the pending row completed.
    Settled,
    /// No pending row matched; the reference is parked for manual review.
    Unmatched,
}

impl MarkerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settled => "settled",
            Self::Unmatched => "unmatched",
        }
    }
}

impl TryFrom<&str> for MarkerStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> ResultEngine<Self> {
        match value {
            "settled" => Ok(Self::Settled),
            "unmatched" => Ok(Self::Unmatched),
            other => Err(EngineError::InvalidInput(format!(
                "invalid reference status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gateway_references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub reference: String,
    pub account_id: String,
    pub purpose: String,
    pub product: Option<String>,
    pub amount_minor: i64,
    pub status: String,
    /// Pending row the reference completed. It may carry its own
    /// initialization reference when it was matched by kind and amount.
    pub transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
