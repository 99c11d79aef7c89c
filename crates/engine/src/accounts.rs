//! The module contains the `Account` balance row and its contribution mode.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// How an account's Piggy requests are treated by the rule resolver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionMode {
    /// ICA-only window first, Piggy afterwards.
    #[default]
    Auto,
    /// Every Piggy request lands in ICA.
    AllIca,
}

impl ContributionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::AllIca => "all_ica",
        }
    }
}

impl TryFrom<&str> for ContributionMode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "auto" => Ok(Self::Auto),
            "all_ica" => Ok(Self::AllIca),
            other => Err(EngineError::InvalidInput(format!(
                "invalid contribution mode \"{other}\": use \"auto\" or \"all_ica\""
            ))),
        }
    }
}

/// Read-only view of an account's balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub wallet_id: Option<String>,
    pub wallet_balance_minor: i64,
    pub ica_balance_minor: i64,
    pub piggy_balance_minor: i64,
    pub contribution_mode: ContributionMode,
    pub esusu_member: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// Numeric member number, the seed of the public wallet id.
    pub member_no: Option<i64>,
    pub password_hash: String,
    pub wallet_balance: i64,
    pub ica_balance: i64,
    pub piggy_balance: i64,
    pub contribution_mode: String,
    pub esusu_member: bool,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub(crate) fn mode(&self) -> ResultEngine<ContributionMode> {
        ContributionMode::try_from(self.contribution_mode.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contributions::Entity")]
    Contributions,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::contributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_storage_labels() {
        for mode in [ContributionMode::Auto, ContributionMode::AllIca] {
            assert_eq!(ContributionMode::try_from(mode.as_str()).unwrap(), mode);
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(matches!(
            ContributionMode::try_from("piggy_first"),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
