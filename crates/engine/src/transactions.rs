//! Transaction records.
//!
//! A `Transaction` is the money-movement history of one account. Rows are
//! written once; the only permitted change is the single `pending →
//! completed` transition of a gateway-funded row.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

impl TransactionKind {
    pub const ALL: [TransactionKind; 8] = [
        Self::Contribution,
        Self::Deposit,
        Self::Fee,
        Self::Withdrawal,
        Self::Transfer,
        Self::WalletTransferSent,
        Self::WalletTransferReceived,
        Self::MonthlyFee,
    ];

    /// Labels tried, in order, for the debit leg of a wallet-to-wallet transfer.
    pub const SENT_FALLBACK: [TransactionKind; 3] =
        [Self::WalletTransferSent, Self::Transfer, Self::Withdrawal];
    /// Labels tried, in order, for the credit leg of a wallet-to-wallet transfer.
    pub const RECEIVED_FALLBACK: [TransactionKind; 3] =
        [Self::WalletTransferReceived, Self::Deposit, Self::Contribution];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contribution => "contribution",
            Self::Deposit => "deposit",
            Self::Fee => "fee",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::WalletTransferSent => "wallet_transfer_sent",
            Self::WalletTransferReceived => "wallet_transfer_received",
            Self::MonthlyFee => "monthly_fee",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EngineError::InvalidInput(format!("invalid transaction kind: {value}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: String,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: &str,
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            kind,
            amount_minor,
            currency,
            status,
            reference: None,
            note: None,
            created_at,
        })
    }

    #[must_use]
    pub fn reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    #[must_use]
    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            account_id: ActiveValue::Set(tx.account_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            reference: ActiveValue::Set(tx.reference.clone()),
            note: ActiveValue::Set(tx.note.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            account_id: model.account_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            status: TransactionStatus::try_from(model.status.as_str())?,
            reference: model.reference,
            note: model.note,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_parses_back() {
        for kind in TransactionKind::ALL {
            assert_eq!(TransactionKind::try_from(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn fallback_lists_start_with_preferred_label() {
        assert_eq!(
            TransactionKind::SENT_FALLBACK[0],
            TransactionKind::WalletTransferSent
        );
        assert_eq!(
            TransactionKind::RECEIVED_FALLBACK[0],
            TransactionKind::WalletTransferReceived
        );
    }
}
