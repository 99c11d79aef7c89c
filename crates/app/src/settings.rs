//! Settings of the application, read from an optional `settings.toml`
//! overlaid by `DEWBOX__*` environment variables
//! (`DEWBOX__GATEWAY__SECRET_KEY`, `DEWBOX__SERVER__PORT`, ...).
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use engine::{Currency, EngineConfig, gateway::HttpGatewayConfig};
use serde::Deserialize;
use server::{RateLimitConfig, RateLimiter, RateLimits};

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
    Postgres(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
            Database::Postgres(url) => url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

/// Overrides of [`EngineConfig`]; absent keys keep the engine defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Engine {
    pub reserve_account_id: Option<String>,
    pub ica_only_limit: Option<u32>,
    pub monthly_fee_rate_bps: Option<u32>,
    pub currency: Option<String>,
    pub public_id_secret: Option<String>,
    pub public_id_prefix: Option<String>,
    pub payer_domain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Gateway {
    pub base_url: Option<String>,
    #[serde(default)]
    pub secret_key: String,
    pub callback_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FeeBatch {
    pub enabled: bool,
}

impl Default for FeeBatch {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// One throttled route group.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Limit {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl From<Limit> for RateLimitConfig {
    fn from(limit: Limit) -> Self {
        RateLimitConfig::new(limit.max_requests, Duration::from_secs(limit.window_secs))
    }
}

/// Overrides of [`RateLimits`]; absent groups keep the server defaults.
#[derive(Debug, Default, Deserialize)]
pub struct RateLimit {
    pub writes: Option<Limit>,
    pub verify: Option<Limit>,
    pub webhook: Option<Limit>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub gateway: Gateway,
    #[serde(default)]
    pub fee_batch: FeeBatch,
    #[serde(default)]
    pub rate_limit: RateLimit,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("DEWBOX")
                        .prefix_separator("__")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let defaults = EngineConfig::default();
        let engine = &self.engine;
        let currency = match engine.currency.as_deref() {
            Some(raw) => Currency::try_from(raw)
                .map_err(|err| ConfigError::Message(format!("engine.currency: {err}")))?,
            None => defaults.currency,
        };

        Ok(EngineConfig {
            reserve_account_id: engine
                .reserve_account_id
                .clone()
                .unwrap_or(defaults.reserve_account_id),
            ica_only_limit: engine.ica_only_limit.unwrap_or(defaults.ica_only_limit),
            monthly_fee_rate_bps: engine
                .monthly_fee_rate_bps
                .unwrap_or(defaults.monthly_fee_rate_bps),
            currency,
            public_id_secret: engine
                .public_id_secret
                .clone()
                .unwrap_or(defaults.public_id_secret),
            public_id_prefix: engine
                .public_id_prefix
                .clone()
                .unwrap_or(defaults.public_id_prefix),
            payer_domain: engine.payer_domain.clone().unwrap_or(defaults.payer_domain),
            callback_base_url: self
                .gateway
                .callback_base_url
                .clone()
                .unwrap_or(defaults.callback_base_url),
            ..defaults
        })
    }

    pub fn rate_limits(&self) -> RateLimits {
        let defaults = RateLimits::default();
        let pick = |limit: Option<Limit>, default: &RateLimiter| {
            limit.map(RateLimitConfig::from).unwrap_or(default.config())
        };
        RateLimits::new(
            pick(self.rate_limit.writes, &defaults.writes),
            pick(self.rate_limit.verify, &defaults.verify),
            pick(self.rate_limit.webhook, &defaults.webhook),
        )
    }

    pub fn gateway_config(&self) -> HttpGatewayConfig {
        let defaults = HttpGatewayConfig::default();
        HttpGatewayConfig {
            base_url: self.gateway.base_url.clone().unwrap_or(defaults.base_url),
            secret_key: self.gateway.secret_key.trim().to_string(),
            timeout: self
                .gateway
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Settings::from_config(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
            .unwrap()
    }

    #[test]
    fn empty_settings_keep_engine_defaults() {
        let settings = parse("");
        assert!(settings.server.is_none());
        assert!(settings.fee_batch.enabled);
        assert_eq!(settings.app.level, "info");

        let config = settings.engine_config().unwrap();
        assert_eq!(config.reserve_account_id, "admin");
        assert_eq!(config.monthly_fee_rate_bps, 200);
        assert!(settings.gateway_config().secret_key.is_empty());
    }

    #[test]
    fn sections_override_defaults() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            port = 3000
            database = { sqlite = "dewbox.db" }

            [engine]
            reserve_account_id = "operator"
            ica_only_limit = 5
            monthly_fee_rate_bps = 150

            [gateway]
            secret_key = " sk_test "
            callback_base_url = "https://app.test"
            timeout_secs = 3

            [fee_batch]
            enabled = false
            "#,
        );

        let server = settings.server.as_ref().unwrap();
        assert_eq!(server.port, 3000);
        assert_eq!(server.database.url(), "sqlite:dewbox.db?mode=rwc");
        assert!(!settings.fee_batch.enabled);

        let config = settings.engine_config().unwrap();
        assert_eq!(config.reserve_account_id, "operator");
        assert_eq!(config.ica_only_limit, 5);
        assert_eq!(config.monthly_fee_rate_bps, 150);
        assert_eq!(config.callback_base_url, "https://app.test");

        let gateway = settings.gateway_config();
        assert_eq!(gateway.secret_key, "sk_test");
        assert_eq!(gateway.timeout, Duration::from_secs(3));
    }

    #[test]
    fn rate_limit_groups_can_be_overridden_one_at_a_time() {
        let settings = parse(
            r#"
            [rate_limit.verify]
            max_requests = 3
            window_secs = 30
            "#,
        );
        let limits = settings.rate_limits();
        let defaults = RateLimits::default();
        assert_eq!(
            limits.verify.config(),
            RateLimitConfig::new(3, Duration::from_secs(30))
        );
        assert_eq!(limits.writes.config(), defaults.writes.config());
        assert_eq!(limits.webhook.config(), defaults.webhook.config());
    }

    #[test]
    fn memory_database_is_a_plain_string() {
        let settings = parse(
            r#"
            [server]
            port = 3000
            database = "memory"
            "#,
        );
        assert_eq!(
            settings.server.unwrap().database.url(),
            "sqlite::memory:"
        );
    }

    #[test]
    fn unknown_currency_is_rejected() {
        let settings = parse("[engine]\ncurrency = \"EUR\"");
        assert!(settings.engine_config().is_err());
    }
}
