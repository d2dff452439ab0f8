//! API configuration

use serde::Deserialize;

use core_kernel::{CoreError, Currency, Timezone};
use domain_discount::{CodeGenerator, AUTO_PREFIX};

/// API configuration
///
/// Every field can be set with an `API_`-prefixed environment variable,
/// e.g. `API_PORT=9000` or `API_CODE_PREFIX=PROMO`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// ISO code of the currency amounts are posted in
    pub currency: String,
    /// IANA timezone that decides "today" for age checks
    pub timezone: String,
    /// Prefix of codes minted by automation rules
    pub code_prefix: String,
    pub code_length: usize,
    /// Collisions tolerated before code generation gives up
    pub code_max_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/dojo".to_string(),
            log_level: "info".to_string(),
            currency: Currency::default().code().to_string(),
            timezone: "America/Vancouver".to_string(),
            code_prefix: AUTO_PREFIX.to_string(),
            code_length: 8,
            code_max_attempts: 10,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn currency(&self) -> Result<Currency, CoreError> {
        self.currency
            .parse()
            .map_err(|e| CoreError::configuration(format!("currency: {}", e)))
    }

    pub fn timezone(&self) -> Result<Timezone, CoreError> {
        Timezone::parse(&self.timezone)
            .map_err(|e| CoreError::configuration(format!("timezone: {}", e)))
    }

    pub fn code_generator(&self) -> CodeGenerator {
        CodeGenerator::new(
            self.code_prefix.clone(),
            self.code_length,
            self.code_max_attempts,
        )
    }
}
