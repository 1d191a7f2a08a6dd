use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::pricing::MalformedRecordPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        let on_malformed = var_or("DISCOUNT_ON_MALFORMED", "skip");
        let on_malformed = on_malformed
            .parse::<MalformedRecordPolicy>()
            .map_err(|_| ConfigError::InvalidMalformedPolicy(on_malformed))?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            batch: BatchConfig {
                input_csv: PathBuf::from(var_or("DISCOUNT_INPUT_CSV", "data/transactions.csv")),
                output_csv: PathBuf::from(var_or(
                    "DISCOUNT_OUTPUT_CSV",
                    "data/discounted_orders.csv",
                )),
                trace_log: PathBuf::from(var_or("DISCOUNT_TRACE_LOG", "data/rules_engine.log")),
                on_malformed,
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// File locations and ingestion policy for batch discount runs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_csv: PathBuf,
    pub output_csv: PathBuf,
    pub trace_log: PathBuf,
    pub on_malformed: MalformedRecordPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("DISCOUNT_ON_MALFORMED must be 'skip' or 'abort', got '{0}'")]
    InvalidMalformedPolicy(String),
}
