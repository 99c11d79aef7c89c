use std::sync::{Arc, atomic::AtomicBool};

use sea_orm::DatabaseConnection;

use crate::{
    ResultEngine,
    config::EngineConfig,
    gateway::{DisabledGateway, PaymentGateway},
    public_id::PublicIdGenerator,
    rules::ContributionRules,
};

mod accounts;
mod contributions;
mod fees;
mod funding;
mod history;
mod ledger;
mod reconcile;
mod transfers;
mod withdrawals;

pub use fees::{FeeAssessment, assess_monthly_fees};
pub use history::DEFAULT_TRANSACTION_LIMIT;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Settlement engine.
///
/// Every balance mutation runs inside one database transaction that takes
/// the exclusive row locks of the accounts it touches in ascending id order.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    config: EngineConfig,
    rules: ContributionRules,
    public_ids: PublicIdGenerator,
    fee_batch_running: AtomicBool,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &ContributionRules {
        &self.rules
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    gateway: Option<Arc<dyn PaymentGateway>>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Payment gateway; without one, gateway operations fail with
    /// `GatewayUnavailable`.
    pub fn gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> EngineBuilder {
        self.gateway = Some(gateway);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let rules = ContributionRules::new(self.config.ica_only_limit);
        let public_ids = PublicIdGenerator::new(
            self.config.public_id_secret.clone(),
            self.config.public_id_prefix.clone(),
        );
        Ok(Engine {
            database: self.database,
            gateway: self
                .gateway
                .unwrap_or_else(|| Arc::new(DisabledGateway)),
            config: self.config,
            rules,
            public_ids,
            fee_batch_running: AtomicBool::new(false),
        })
    }
}
