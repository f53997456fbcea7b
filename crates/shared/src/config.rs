//! Application configuration management.
//!
//! Sources are layered: `config/default.toml`, then `config/{RUN_MODE}.toml`,
//! then environment variables prefixed `KOSH` with `__` as the nesting
//! separator (`KOSH__LEDGER__RETRY__MAX_ATTEMPTS=5`).

use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger behaviour shared by every tenant of a deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Currency all books are kept in.
    #[serde(default)]
    pub base_currency: Currency,
    /// Month (1-12) the fiscal year starts in. April for Indian trusts.
    #[serde(default = "default_fiscal_year_start_month")]
    pub fiscal_year_start_month: u32,
    /// Equity account receiving the year-end surplus transfer.
    #[serde(default = "default_surplus_account_code")]
    pub surplus_account_code: String,
    /// Prefix of generated entry numbers (`JE-2025-000001`).
    #[serde(default = "default_entry_number_prefix")]
    pub entry_number_prefix: String,
    /// Retry policy for serialization failures and deadlocks.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_fiscal_year_start_month() -> u32 {
    4
}

fn default_surplus_account_code() -> String {
    "3100".to_string()
}

fn default_entry_number_prefix() -> String {
    "JE".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_currency: Currency::default(),
            fiscal_year_start_month: default_fiscal_year_start_month(),
            surplus_account_code: default_surplus_account_code(),
            entry_number_prefix: default_entry_number_prefix(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay added per attempt, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    25
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "kosh=debug,sea_orm=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from config files and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KOSH").separator("__"))
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=12).contains(&self.ledger.fiscal_year_start_month) {
            return Err(config::ConfigError::Message(format!(
                "ledger.fiscal_year_start_month must be 1-12, got {}",
                self.ledger.fiscal_year_start_month
            )));
        }
        if self.ledger.retry.max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "ledger.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
