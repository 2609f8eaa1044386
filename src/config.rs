use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    pub clinic: ClinicConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Bounds pool checkout and every store call.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the session provider.
    pub session_secret: String,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ClinicConfig {
    pub default_fee: f64,
    pub default_duration: i32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            default_fee: 1000.0,
            default_duration: 60,
        }
    }
}

/// Reads the configuration from the process environment. Call
/// [`crate::bootstrap::init_env`] first so `.env` values are visible.
pub fn load() -> anyhow::Result<Config> {
    Ok(Config {
        server: ServerConfig {
            port: try_load("PORT", "3000")?,
        },
        database: DatabaseConfig {
            url: required("DATABASE_URL")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
            timeout: Duration::from_secs(try_load("DATABASE_TIMEOUT_SECS", "5")?),
        },
        auth: AuthConfig {
            session_secret: required("SESSION_SECRET")?,
        },
        stripe: StripeConfig {
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            currency: try_load("STRIPE_CURRENCY", "usd")?,
            success_url: try_load(
                "CHECKOUT_SUCCESS_URL",
                "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}",
            )?,
            cancel_url: try_load("CHECKOUT_CANCEL_URL", "http://localhost:3000/checkout/cancel")?,
            timeout: Duration::from_secs(try_load("GATEWAY_TIMEOUT_SECS", "10")?),
        },
        clinic: ClinicConfig {
            default_fee: try_load("CLINIC_DEFAULT_FEE", "1000.0")?,
            ..ClinicConfig::default()
        },
    })
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("Environment variable {key} must be set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    parse_or_default(key, env::var(key).ok(), default)
}

fn parse_or_default<T: FromStr>(key: &str, value: Option<String>, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let value = value.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Invalid {key} value '{value}': {e}")
    })
}
