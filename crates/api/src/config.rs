//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use orchestrator::{OrchestratorConfig, WorkerKind};
use thiserror::Error;

/// Configuration errors detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    /// Some worker URLs are set and others are not.
    #[error("worker URLs must be set for all four workers or none; missing {}", .missing.join(", "))]
    PartialWorkerUrls { missing: Vec<&'static str> },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

/// Endpoints of the four remote workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEndpoints {
    pub inventory: String,
    pub payment: String,
    pub shipping: String,
    pub tax: String,
}

impl WorkerEndpoints {
    pub fn endpoint(&self, kind: WorkerKind) -> &str {
        match kind {
            WorkerKind::Inventory => &self.inventory,
            WorkerKind::Payment => &self.payment,
            WorkerKind::Shipping => &self.shipping,
            WorkerKind::Tax => &self.tax,
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `json` or `pretty` (default: `json`)
/// - `FUNCTION_NAME` — name attached to every workflow log line (default: `"order-orchestrator"`)
/// - `INVENTORY_WORKER_URL`, `PAYMENT_WORKER_URL`, `SHIPPING_WORKER_URL`,
///   `TAX_WORKER_URL` — remote worker endpoints; when none is set the
///   in-memory workers are used
/// - `WORKER_MAX_ATTEMPTS` — attempts per worker call (default: `3`)
/// - `WORKER_TIMEOUT_SECS` — per-call timeout (default: `30`)
/// - `ORDER_CURRENCY` — currency of the order totals (default: `"USD"`)
/// - `FINALIZE_DELAY_MS` — pause before finalization (default: `1000`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub function_name: String,
    pub workers: Option<WorkerEndpoints>,
    pub worker_max_attempts: usize,
    pub worker_timeout: Duration,
    pub currency: String,
    pub finalize_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let log_format = match get("LOG_FORMAT") {
            Some(value) => value.parse().map_err(|()| ConfigError::Invalid {
                var: "LOG_FORMAT",
                value,
            })?,
            None => defaults.log_format,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse(&get, "PORT", defaults.port)?,
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            function_name: get("FUNCTION_NAME").unwrap_or(defaults.function_name),
            workers: worker_endpoints(&get)?,
            worker_max_attempts: parse(&get, "WORKER_MAX_ATTEMPTS", defaults.worker_max_attempts)?,
            worker_timeout: Duration::from_secs(parse(&get, "WORKER_TIMEOUT_SECS", 30)?),
            currency: get("ORDER_CURRENCY").unwrap_or(defaults.currency),
            finalize_delay: Duration::from_millis(parse(&get, "FINALIZE_DELAY_MS", 1000)?),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_currency(self.currency.clone())
            .with_finalize_delay(self.finalize_delay)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            function_name: "order-orchestrator".to_string(),
            workers: None,
            worker_max_attempts: 3,
            worker_timeout: Duration::from_secs(30),
            currency: "USD".to_string(),
            finalize_delay: Duration::from_secs(1),
        }
    }
}

fn parse<T, F>(get: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn worker_endpoints<F>(get: &F) -> Result<Option<WorkerEndpoints>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const VARS: [&str; 4] = [
        "INVENTORY_WORKER_URL",
        "PAYMENT_WORKER_URL",
        "SHIPPING_WORKER_URL",
        "TAX_WORKER_URL",
    ];

    let values = VARS.map(|var| get(var));
    match values {
        [None, None, None, None] => Ok(None),
        [Some(inventory), Some(payment), Some(shipping), Some(tax)] => Ok(Some(WorkerEndpoints {
            inventory,
            payment,
            shipping,
            tax,
        })),
        partial => Err(ConfigError::PartialWorkerUrls {
            missing: VARS
                .iter()
                .zip(partial.iter())
                .filter(|(_, value)| value.is_none())
                .map(|(var, _)| *var)
                .collect(),
        }),
    }
}
