use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::{net::SocketAddr, sync::Arc, time::Duration};

use crate::{
    accounts, contributions,
    rate_limit::{RateLimits, rate_limit},
    transactions, webhooks,
};
use engine::{Engine, EngineError};

const LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub limits: RateLimits,
}

impl ServerState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            limits: RateLimits::default(),
        }
    }

    pub fn limits(mut self, limits: RateLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Account id of the authenticated member, set by the auth middleware.
#[derive(Clone, Debug)]
pub struct AuthAccount(pub String);

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let account_id = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
        .map_err(|err| match err {
            EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            other => {
                tracing::error!("authentication failed: {other}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    request.extensions_mut().insert(AuthAccount(account_id));
    Ok(next.run(request).await)
}

/// Member routes behind Basic auth, plus the unauthenticated gateway webhook.
///
/// Money-moving writes and verification by reference are throttled per
/// member, the webhook per peer address.
pub fn router(state: ServerState) -> Router {
    let limits = state.limits.clone();

    let writes = Router::new()
        .route("/contributions", post(contributions::create))
        .route("/contributions/settings", patch(contributions::settings))
        .route(
            "/contributions/piggy/withdraw",
            post(contributions::piggy_withdraw),
        )
        .route("/transactions/fund", post(transactions::fund))
        .route("/transactions/withdraw", post(transactions::withdraw))
        .route("/transactions/wallet", post(transactions::wallet_send))
        .route_layer(middleware::from_fn_with_state(limits.writes, rate_limit));

    let verify = Router::new()
        .route(
            "/contributions/verify/{reference}",
            get(contributions::verify),
        )
        .route(
            "/transactions/verify/{reference}",
            get(transactions::verify),
        )
        .route_layer(middleware::from_fn_with_state(limits.verify, rate_limit));

    let member = Router::new()
        .route("/me", get(accounts::me))
        .route("/contributions/info", get(contributions::info))
        .route("/contributions/history", get(contributions::history))
        .route("/transactions", get(transactions::list))
        .merge(writes)
        .merge(verify)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let webhook = Router::new()
        .route("/webhooks/gateway", post(webhooks::gateway))
        .route_layer(middleware::from_fn_with_state(limits.webhook, rate_limit));

    Router::new()
        .merge(member)
        .merge(webhook)
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let limits = state.limits.clone();
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMIT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            limits.cleanup();
        }
    });

    let result = axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await;
    sweeper.abort();
    result
}
