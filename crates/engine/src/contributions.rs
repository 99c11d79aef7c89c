//! Contribution records.
//!
//! A `Contribution` is immutable history: one row per successful settlement
//! into a savings product, plus one `FEE` row per monthly fee deduction. The
//! rows of the current month drive the rule resolver's monthly count and the
//! rows of the previous month are the fee batch's base.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Savings product a contribution lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Product {
    Ica,
    Piggy,
    Esusu,
    Fee,
}

impl Product {
    /// Products counted towards the ICA-only window.
    pub const WINDOW_TRACKED: [Product; 3] = [Product::Ica, Product::Piggy, Product::Esusu];
    /// Products the monthly fee is assessed on.
    pub const FEE_BASE: [Product; 2] = [Product::Ica, Product::Piggy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ica => "ICA",
            Self::Piggy => "PIGGY",
            Self::Esusu => "ESUSU",
            Self::Fee => "FEE",
        }
    }

    /// Parses a product a member may request. `FEE` is engine-internal.
    pub fn parse_requested(value: &str) -> ResultEngine<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ICA" => Ok(Self::Ica),
            "PIGGY" => Ok(Self::Piggy),
            "ESUSU" => Ok(Self::Esusu),
            _ => Err(EngineError::InvalidProduct(value.trim().to_string())),
        }
    }
}

impl TryFrom<&str> for Product {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ICA" => Ok(Self::Ica),
            "PIGGY" => Ok(Self::Piggy),
            "ESUSU" => Ok(Self::Esusu),
            "FEE" => Ok(Self::Fee),
            other => Err(EngineError::InvalidProduct(other.to_string())),
        }
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub account_id: String,
    pub product: Product,
    pub amount_minor: i64,
    pub year: i32,
    pub month: u32,
    pub contribution_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contribution {
    pub fn new(
        account_id: &str,
        product: Product,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
        description: Option<String>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let date = occurred_at.date_naive();
        Ok(Self {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            product,
            amount_minor,
            year: chrono::Datelike::year(&date),
            month: chrono::Datelike::month(&date),
            contribution_date: date,
            description,
            created_at: occurred_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub product: String,
    pub amount_minor: i64,
    pub year: i32,
    pub month: i32,
    pub contribution_date: Date,
    pub description: Option<String>,
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

impl From<&Contribution> for ActiveModel {
    fn from(value: &Contribution) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            account_id: ActiveValue::Set(value.account_id.clone()),
            product: ActiveValue::Set(value.product.as_str().to_string()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            year: ActiveValue::Set(value.year),
            month: ActiveValue::Set(value.month as i32),
            contribution_date: ActiveValue::Set(value.contribution_date),
            description: ActiveValue::Set(value.description.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Contribution {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("contribution not exists".to_string()))?,
            account_id: model.account_id,
            product: Product::try_from(model.product.as_str())?,
            amount_minor: model.amount_minor,
            year: model.year,
            month: u32::try_from(model.month)
                .map_err(|_| EngineError::InvalidInput(format!("invalid month {}", model.month)))?,
            contribution_date: model.contribution_date,
            description: model.description,
            created_at: model.created_at,
        })
    }
}
