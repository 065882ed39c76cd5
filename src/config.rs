use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::domain::checkout::ShippingFees;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub midtrans_server_key: String,
    pub midtrans_is_production: bool,
    /// Overrides the Snap host picked by `midtrans_is_production`.
    pub midtrans_base_url: Option<String>,
    pub site_url: String,
    pub shipping_fees: ShippingFees,
    pub outbox_relay_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let var_or = |name: &'static str, default: &str| -> String {
            lookup(name).unwrap_or_else(|| default.to_string())
        };
        fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        }

        let defaults = ShippingFees::default();
        let standard: i64 = parse(
            "SHIPPING_FEE_STANDARD",
            var_or("SHIPPING_FEE_STANDARD", &defaults.standard.to_string()),
        )?;
        let express: i64 = parse(
            "SHIPPING_FEE_EXPRESS",
            var_or("SHIPPING_FEE_EXPRESS", &defaults.express.to_string()),
        )?;
        for (name, fee) in [("SHIPPING_FEE_STANDARD", standard), ("SHIPPING_FEE_EXPRESS", express)] {
            if fee < 0 {
                return Err(ConfigError::Invalid {
                    name,
                    value: fee.to_string(),
                });
            }
        }

        let relay_ms: u64 = parse(
            "OUTBOX_RELAY_INTERVAL_MS",
            var_or("OUTBOX_RELAY_INTERVAL_MS", "500"),
        )?;
        if relay_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "OUTBOX_RELAY_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: var_or("HOST", "0.0.0.0"),
            port: parse("PORT", var_or("PORT", "8080"))?,
            midtrans_server_key: required("MIDTRANS_SERVER_KEY")?,
            midtrans_is_production: parse(
                "MIDTRANS_IS_PRODUCTION",
                var_or("MIDTRANS_IS_PRODUCTION", "false"),
            )?,
            midtrans_base_url: lookup("MIDTRANS_BASE_URL").filter(|v| !v.trim().is_empty()),
            site_url: var_or("SITE_URL", "http://localhost:3000"),
            shipping_fees: ShippingFees { standard, express },
            outbox_relay_interval: Duration::from_millis(relay_ms),
        })
    }
}
