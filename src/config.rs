use std::{env, fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::order::TransitionPolicy;
use crate::domain::pricing::{max_amount, DeliveryPolicy};

#[derive(Debug, thiserror::Error)]
#[error("Invalid {key} value {value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_host: String,
    pub http_port: u16,
    pub metrics_port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// `None` runs with log-only notifications.
    pub telegram: Option<TelegramConfig>,
    pub delivery: DeliveryPolicy,
    pub status_policy: TransitionPolicy,
    /// Admin account created at startup. Honored only with the in-memory
    /// store; unset means no admin exists until one is provisioned.
    pub demo_admin_id: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` reads the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram = match var("TELEGRAM_BOT_TOKEN") {
            Some(bot_token) => Some(TelegramConfig {
                bot_token,
                api_base: try_load(&var, "TELEGRAM_API_BASE", "https://api.telegram.org")?,
            }),
            None => {
                warn!("TELEGRAM_BOT_TOKEN not set, status notifications will only be logged");
                None
            }
        };

        let database_url = var("DATABASE_URL");
        if database_url.is_none() {
            warn!("DATABASE_URL not set, using in-memory store with demo menu");
        }

        let fee: Decimal = try_load(&var, "DELIVERY_FEE", "2.99")?;
        let free_threshold: Decimal = try_load(&var, "FREE_DELIVERY_THRESHOLD", "25.00")?;
        if fee.is_sign_negative() || fee > max_amount() {
            return Err(invalid("DELIVERY_FEE", fee, "must be between 0 and 99999999.99"));
        }
        if free_threshold.is_sign_negative() {
            return Err(invalid("FREE_DELIVERY_THRESHOLD", free_threshold, "must not be negative"));
        }

        let database_max_connections: u32 = try_load(&var, "DATABASE_MAX_CONNECTIONS", "5")?;
        if database_max_connections == 0 {
            return Err(invalid("DATABASE_MAX_CONNECTIONS", 0, "must be at least 1"));
        }

        Ok(Self {
            http_host: try_load(&var, "HTTP_HOST", "0.0.0.0")?,
            http_port: try_load(&var, "HTTP_PORT", "5000")?,
            metrics_port: try_load(&var, "METRICS_PORT", "9090")?,
            database_url,
            database_max_connections,
            telegram,
            delivery: DeliveryPolicy::new(fee, free_threshold),
            status_policy: try_load(&var, "ORDER_STATUS_POLICY", "forward_only")?,
            demo_admin_id: var("DEMO_ADMIN_ID"),
        })
    }
}

fn invalid(key: &'static str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn try_load<T, F>(var: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        invalid(key, &raw, &e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.http_host, "0.0.0.0");
        assert_eq!(config.http_port, 5000);
        assert_eq!(config.metrics_port, 9090);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
        assert!(config.telegram.is_none());
        assert_eq!(config.delivery, DeliveryPolicy::default());
        assert_eq!(config.status_policy, TransitionPolicy::ForwardOnly);
        assert!(config.demo_admin_id.is_none());
    }

    #[test]
    fn test_demo_admin_is_opt_in() {
        let config = config_from(&[("DEMO_ADMIN_ID", " ops-lead ")]).unwrap();
        assert_eq!(config.demo_admin_id.as_deref(), Some("ops-lead"));

        let config = config_from(&[("DEMO_ADMIN_ID", "")]).unwrap();
        assert!(config.demo_admin_id.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HTTP_PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/durger"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DELIVERY_FEE", "3.50"),
            ("FREE_DELIVERY_THRESHOLD", "40"),
            ("ORDER_STATUS_POLICY", "permissive"),
        ])
        .unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/durger"));
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.bot_token, "123:abc");
        assert_eq!(telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.delivery.fee, Decimal::new(350, 2));
        assert_eq!(config.delivery.free_threshold, Decimal::new(40, 0));
        assert_eq!(config.status_policy, TransitionPolicy::Permissive);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = config_from(&[("HTTP_PORT", "eighty")]).unwrap_err();
        assert_eq!(err.key, "HTTP_PORT");

        let err = config_from(&[("ORDER_STATUS_POLICY", "anything_goes")]).unwrap_err();
        assert_eq!(err.key, "ORDER_STATUS_POLICY");

        let err = config_from(&[("DELIVERY_FEE", "-1")]).unwrap_err();
        assert_eq!(err.key, "DELIVERY_FEE");
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "  "), ("HTTP_PORT", "")]).unwrap();
        assert!(config.telegram.is_none());
        assert_eq!(config.http_port, 5000);
    }
}
