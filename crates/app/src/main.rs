use std::sync::Arc;

use engine::{
    Engine,
    gateway::{DisabledGateway, HttpGateway, PaymentGateway},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, DatabaseConnection};

mod scheduler;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "dewbox={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server.as_ref() else {
        tracing::warn!("no [server] settings found, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = connect_database(&server.database).await?;
    let gateway: Arc<dyn PaymentGateway> = if settings.gateway.secret_key.trim().is_empty() {
        tracing::warn!("payment gateway secret missing, gateway operations are disabled");
        Arc::new(DisabledGateway)
    } else {
        Arc::new(HttpGateway::new(settings.gateway_config())?)
    };

    let engine = Engine::builder()
        .database(db)
        .gateway(gateway)
        .config(settings.engine_config()?)
        .build()
        .await?;
    engine.ensure_reserve_account().await?;
    let engine = Arc::new(engine);

    let bind = server.bind.clone().unwrap_or_else(|| "127.0.0.1".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{bind}:{}", server.port)).await?;
    {
        let state = server::ServerState::new(engine.clone()).limits(settings.rate_limits());
        tasks.spawn(async move {
            if let Err(err) = server::run_with_listener(state, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    if settings.fee_batch.enabled {
        tracing::info!("monthly fee batch scheduled");
        tasks.spawn(scheduler::run(engine));
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn connect_database(
    config: &settings::Database,
) -> Result<DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let mut options = ConnectOptions::new(config.url());
    options.sqlx_logging(false);
    if matches!(config, settings::Database::Memory) {
        // Every pooled connection would otherwise get its own empty database.
        options.max_connections(1);
    }

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
