#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Engine, EngineConfig, NewAccountCmd,
    gateway::{
        GatewayError, InitializeRequest, InitializedPayment, PaymentGateway, PaymentTag,
        PayoutRequest, PayoutResult, VerifiedPayment,
    },
};
use migration::MigratorTrait;

pub const PASSWORD: &str = "correct horse";
pub const RESERVE: &str = "admin";

/// Gateway double: `initialize` hands out sequential references and
/// remembers the tag, `verify` answers from a script keyed by reference.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    counter: AtomicUsize,
    tags: Mutex<HashMap<String, (PaymentTag, i64)>>,
    verify: Mutex<HashMap<String, Result<VerifiedPayment, GatewayError>>>,
    payout: Mutex<Option<Result<PayoutResult, GatewayError>>>,
    pub verify_calls: AtomicUsize,
    pub payout_calls: AtomicUsize,
}

impl ScriptedGateway {
    /// Scripts a successful verification of an initialized reference.
    pub fn succeed(&self, reference: &str) {
        let (tag, amount_minor) = self
            .tags
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .expect("reference was never initialized");
        self.script_verify(reference, Ok(verified(reference, tag, amount_minor)));
    }

    /// Currently scripted answer for `reference`.
    pub fn verify_answer(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        self.verify
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .expect("reference was never scripted")
    }

    pub fn script_verify(&self, reference: &str, answer: Result<VerifiedPayment, GatewayError>) {
        self.verify
            .lock()
            .unwrap()
            .insert(reference.to_string(), answer);
    }

    pub fn script_payout(&self, answer: Result<PayoutResult, GatewayError>) {
        *self.payout.lock().unwrap() = Some(answer);
    }
}

#[async_trait::async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("ref-{n}");
        self.tags
            .lock()
            .unwrap()
            .insert(reference.clone(), (request.tag, request.amount_minor));
        Ok(InitializedPayment {
            authorization_url: format!("https://checkout.test/{reference}"),
            reference,
            access_code: Some(format!("code-{n}")),
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verify
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::Rejected(format!("unknown {reference}"))))
    }

    async fn payout(&self, request: PayoutRequest) -> Result<PayoutResult, GatewayError> {
        self.payout_calls.fetch_add(1, Ordering::SeqCst);
        self.payout
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| {
                Ok(PayoutResult {
                    success: true,
                    reference: request.reference,
                    status: "success".to_string(),
                    message: None,
                })
            })
    }
}

pub fn verified(reference: &str, tag: PaymentTag, amount_minor: i64) -> VerifiedPayment {
    VerifiedPayment {
        reference: reference.to_string(),
        success: true,
        status: "success".to_string(),
        amount_minor,
        requested_amount_minor: Some(amount_minor),
        fees_minor: Some(0),
        currency: Some("NGN".to_string()),
        tag: Some(tag),
        channel: Some("card".to_string()),
        ..VerifiedPayment::default()
    }
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub gateway: Arc<ScriptedGateway>,
}

/// Migrated in-memory database.
pub async fn database() -> DatabaseConnection {
    // A single connection keeps the in-memory database shared and
    // serializes concurrent units of work.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// Engine with the reserve account in place.
pub async fn engine_with(db: &DatabaseConnection, gateway: Arc<dyn PaymentGateway>) -> Engine {
    let config = EngineConfig {
        password_hash_cost: 4,
        public_id_secret: "test-secret".to_string(),
        ..EngineConfig::default()
    };
    let engine = Engine::builder()
        .database(db.clone())
        .gateway(gateway)
        .config(config)
        .build()
        .await
        .unwrap();
    engine.ensure_reserve_account().await.unwrap();
    engine
}

pub async fn harness() -> Harness {
    let db = database().await;
    let gateway = Arc::new(ScriptedGateway::default());
    let engine = engine_with(&db, gateway.clone()).await;
    Harness {
        engine: Arc::new(engine),
        db,
        gateway,
    }
}

impl Harness {
    pub async fn account(&self, id: &str, wallet_minor: i64) -> String {
        self.engine
            .create_account(
                NewAccountCmd::new(format!("Member {id}"), PASSWORD, at(2026, 1, 1))
                    .id(id)
                    .email(format!("{id}@dewbox.test")),
            )
            .await
            .unwrap();
        self.set_balances(id, wallet_minor, 0, 0).await;
        id.to_string()
    }

    pub async fn set_balances(&self, id: &str, wallet: i64, ica: i64, piggy: i64) {
        self.execute(
            "UPDATE accounts SET wallet_balance = ?, ica_balance = ?, piggy_balance = ? WHERE id = ?",
            vec![wallet.into(), ica.into(), piggy.into(), id.into()],
        )
        .await;
    }

    pub async fn execute(&self, sql: &str, values: Vec<sea_orm::Value>) {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_sql_and_values(backend, sql, values))
            .await
            .unwrap();
    }

    /// `(wallet, ica, piggy)` of an account.
    pub async fn balances(&self, id: &str) -> (i64, i64, i64) {
        let summary = self.engine.account_summary(id).await.unwrap();
        (
            summary.wallet_balance_minor,
            summary.ica_balance_minor,
            summary.piggy_balance_minor,
        )
    }

    pub async fn count(&self, sql: &str, values: Vec<sea_orm::Value>) -> i64 {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(backend, sql, values))
            .await
            .unwrap()
            .unwrap();
        row.try_get_by_index::<i64>(0).unwrap()
    }
}
