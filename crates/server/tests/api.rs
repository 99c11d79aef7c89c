use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{
    Engine, EngineConfig, NewAccountCmd,
    gateway::{
        GatewayError, InitializeRequest, InitializedPayment, PaymentGateway, PaymentPurpose,
        PaymentTag, PayoutRequest, PayoutResult, VerifiedPayment,
    },
};
use migration::MigratorTrait;
use server::{RateLimitConfig, RateLimits, ServerState, router};

const PASSWORD: &str = "correct horse";

/// Settles every reference it knows the tag of.
#[derive(Debug, Default)]
struct SettlingGateway {
    counter: AtomicUsize,
    tags: Mutex<HashMap<String, (PaymentTag, i64)>>,
}

impl SettlingGateway {
    /// A successful payment the engine never initialized.
    fn orphan(&self, reference: &str, account_id: &str, amount_minor: i64) {
        let tag = PaymentTag {
            account_id: account_id.to_string(),
            purpose: PaymentPurpose::Deposit,
            product: None,
            description: None,
        };
        self.tags
            .lock()
            .unwrap()
            .insert(reference.to_string(), (tag, amount_minor));
    }
}

#[async_trait::async_trait]
impl PaymentGateway for SettlingGateway {
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
            access_code: None,
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let Some((tag, amount_minor)) = self.tags.lock().unwrap().get(reference).cloned() else {
            return Err(GatewayError::Rejected(format!("unknown {reference}")));
        };
        Ok(VerifiedPayment {
            reference: reference.to_string(),
            success: true,
            status: "success".to_string(),
            amount_minor,
            currency: Some("NGN".to_string()),
            tag: Some(tag),
            paid_at: Some(Utc::now()),
            ..VerifiedPayment::default()
        })
    }

    async fn payout(&self, request: PayoutRequest) -> Result<PayoutResult, GatewayError> {
        Ok(PayoutResult {
            success: true,
            reference: request.reference,
            status: "success".to_string(),
            message: None,
        })
    }
}

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    gateway: Arc<SettlingGateway>,
}

async fn app() -> TestApp {
    app_with(RateLimits::default()).await
}

async fn app_with(limits: RateLimits) -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let gateway = Arc::new(SettlingGateway::default());
    let engine = Engine::builder()
        .database(db.clone())
        .gateway(gateway.clone())
        .config(EngineConfig {
            password_hash_cost: 4,
            public_id_secret: "test-secret".to_string(),
            ..EngineConfig::default()
        })
        .build()
        .await
        .unwrap();
    engine.ensure_reserve_account().await.unwrap();

    for (member_no, id) in [(1001, "alice"), (1002, "bob")] {
        engine
            .create_account(
                NewAccountCmd::new(format!("Member {id}"), PASSWORD, Utc::now())
                    .id(id)
                    .email(format!("{id}@dewbox.test"))
                    .member_no(member_no),
            )
            .await
            .unwrap();
    }
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE accounts SET wallet_balance = ? WHERE id = ?",
        vec![10_000i64.into(), "alice".into()],
    ))
    .await
    .unwrap();

    TestApp {
        router: router(ServerState::new(Arc::new(engine)).limits(limits)),
        db,
        gateway,
    }
}

fn basic(user: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{PASSWORD}")))
}

async fn call(
    app: &TestApp,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header(header::AUTHORIZATION, basic(user));
    }
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&body).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn member_routes_require_basic_auth() {
    let app = app().await;

    let (status, _) = call(&app, "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = Request::builder().method("GET").uri("/me");
    request = request.header(
        header::AUTHORIZATION,
        format!("Basic {}", STANDARD.encode("alice:wrong")),
    );
    let response = app
        .router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_balances_and_wallet_id() {
    let app = app().await;

    let (status, body) = call(&app, "GET", "/me", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");
    assert_eq!(body["wallet_balance_minor"], 10_000);
    assert_eq!(body["contribution_mode"], "auto");
    assert!(body["wallet_id"].as_str().unwrap().starts_with("MDBX-"));
}

#[tokio::test]
async fn wallet_contribution_is_adjusted_inside_the_window() {
    let app = app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/contributions",
        Some("alice"),
        Some(json!({ "amount_minor": 4_000, "product": "piggy" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["resolution"]["requested"], "PIGGY");
    assert_eq!(body["resolution"]["resolved"], "ICA");
    assert_eq!(body["resolution"]["adjusted"], true);
    assert_eq!(body["wallet_balance_minor"], 6_000);
    assert_eq!(body["ica_balance_minor"], 4_000);

    let (status, body) = call(&app, "GET", "/contributions/info", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monthly_count"], 1);
    assert_eq!(body["remaining_ica_only"], 9);

    let (status, body) = call(&app, "GET", "/contributions/history", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contributions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn validation_and_balance_errors_are_unprocessable() {
    let app = app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/contributions",
        Some("alice"),
        Some(json!({ "amount_minor": 50_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Insufficient balance");

    let (status, _) = call(
        &app,
        "POST",
        "/contributions",
        Some("alice"),
        Some(json!({ "amount_minor": 100, "product": "GOLD" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, me) = call(&app, "GET", "/me", Some("alice"), None).await;
    assert_eq!(me["wallet_balance_minor"], 10_000);
}

#[tokio::test]
async fn funding_settles_once_on_verify() {
    let app = app().await;

    let (status, started) = call(
        &app,
        "POST",
        "/transactions/fund",
        Some("alice"),
        Some(json!({ "amount_minor": 20_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(started["purpose"], "deposit");
    let reference = started["reference"].as_str().unwrap().to_string();

    let uri = format!("/transactions/verify/{reference}");
    let (status, verified) = call(&app, "GET", &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["status"], "settled");
    assert_eq!(verified["replayed"], false);
    assert_eq!(verified["receipt"]["amount_minor"], 20_000);

    let (_, again) = call(&app, "GET", &uri, Some("alice"), None).await;
    assert_eq!(again["replayed"], true);

    let (status, _) = call(&app, "GET", &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, me) = call(&app, "GET", "/me", Some("alice"), None).await;
    assert_eq!(me["wallet_balance_minor"], 30_000);
}

#[tokio::test]
async fn contribution_purpose_is_not_a_funding_purpose() {
    let app = app().await;

    let (status, _) = call(
        &app,
        "POST",
        "/transactions/fund",
        Some("alice"),
        Some(json!({ "amount_minor": 1_000, "purpose": "contribution" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_settles_and_parks_unmatched_references() {
    let app = app().await;

    let (_, started) = call(
        &app,
        "POST",
        "/transactions/fund",
        Some("bob"),
        Some(json!({ "amount_minor": 5_000 })),
    )
    .await;
    let reference = started["reference"].as_str().unwrap();

    let (status, ack) = call(
        &app,
        "POST",
        "/webhooks/gateway",
        None,
        Some(json!({ "event": "charge.success", "data": { "reference": reference } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "settled");

    app.gateway.orphan("orphan", "bob", 7_000);
    let (status, ack) = call(
        &app,
        "POST",
        "/webhooks/gateway",
        None,
        Some(json!({ "event": "charge.success", "data": { "reference": "orphan" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "unmatched");

    let (status, ack) = call(
        &app,
        "POST",
        "/webhooks/gateway",
        None,
        Some(json!({ "event": "transfer.success", "data": { "reference": "x" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], Value::Null);

    let (_, me) = call(&app, "GET", "/me", Some("bob"), None).await;
    assert_eq!(me["wallet_balance_minor"], 5_000);
}

#[tokio::test]
async fn wallet_send_moves_money_between_members() {
    let app = app().await;

    let (status, sent) = call(
        &app,
        "POST",
        "/transactions/wallet",
        Some("alice"),
        Some(json!({
            "recipient": "bob@dewbox.test",
            "amount_minor": 3_000,
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["recipient_id"], "bob");
    assert_eq!(sent["wallet_balance_minor"], 7_000);

    let (status, list) = call(&app, "GET", "/transactions?limit=5", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["transactions"][0]["kind"], "wallet_transfer_received");

    let (status, _) = call(
        &app,
        "POST",
        "/transactions/wallet",
        Some("alice"),
        Some(json!({ "recipient": "nobody", "amount_minor": 1, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        "POST",
        "/transactions/wallet",
        Some("alice"),
        Some(json!({ "recipient": "bob", "amount_minor": 1, "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let backend = app.db.get_database_backend();
    let row = app
        .db
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) FROM transactions WHERE kind = 'wallet_transfer_sent'",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get_by_index::<i64>(0).unwrap(), 1);
}

#[tokio::test]
async fn bank_withdrawal_debits_the_wallet() {
    let app = app().await;

    let (status, payout) = call(
        &app,
        "POST",
        "/transactions/withdraw",
        Some("alice"),
        Some(json!({
            "amount_minor": 2_500,
            "account_number": "0123456789",
            "bank_code": "058",
            "account_name": "Member alice",
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payout["kind"], "withdrawal");
    assert_eq!(payout["wallet_balance_minor"], 7_500);
}

fn tight_limits(max_requests: u32) -> RateLimits {
    let limit = RateLimitConfig::new(max_requests, Duration::from_secs(600));
    RateLimits::new(limit, limit, limit)
}

#[tokio::test]
async fn verification_is_throttled_per_member() {
    let app = app_with(tight_limits(2)).await;
    let verify = "/transactions/verify/unknown";

    for _ in 0..2 {
        let (status, _) = call(&app, "GET", verify, Some("alice"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
    let (status, body) = call(&app, "GET", verify, Some("alice"), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("too many requests"));

    // Another member has a window of its own; reads are never throttled.
    let (status, _) = call(
        &app,
        "GET",
        "/contributions/verify/unknown",
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    for _ in 0..3 {
        let (status, _) = call(&app, "GET", "/me", Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn money_moving_writes_are_throttled() {
    let app = app_with(tight_limits(1)).await;
    let send = json!({ "recipient": "bob", "amount_minor": 100, "password": PASSWORD });

    let (status, _) = call(
        &app,
        "POST",
        "/transactions/wallet",
        Some("alice"),
        Some(send.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call(&app, "POST", "/transactions/wallet", Some("alice"), Some(send)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // The refused request never reached the engine.
    let (_, me) = call(&app, "GET", "/me", Some("alice"), None).await;
    assert_eq!(me["wallet_balance_minor"], 9_900);

    // Unauthenticated requests are turned away before they are counted.
    let (status, _) = call(&app, "POST", "/transactions/fund", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_is_throttled_per_peer_address() {
    let app = app_with(tight_limits(1)).await;

    let webhook = |peer: &str| {
        let event = json!({ "event": "transfer.success", "data": { "reference": "x" } });
        let mut request = Request::builder()
            .method("POST")
            .uri("/webhooks/gateway")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&event).unwrap()))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        app.router.clone().oneshot(request)
    };

    let first = webhook("10.0.0.1:4000").await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let refused = webhook("10.0.0.1:4001").await.unwrap();
    assert_eq!(refused.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(refused.headers().contains_key(header::RETRY_AFTER));
    let other = webhook("10.0.0.2:4000").await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}
