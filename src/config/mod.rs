use std::env;
use std::fmt;
use std::time::Duration;

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

/// Top-level configuration for report generation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let image_concurrency = parse_env("REPORT_IMAGE_CONCURRENCY", 4)?;
        if image_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "REPORT_IMAGE_CONCURRENCY",
                reason: "must be at least 1",
            });
        }
        let threshold_ttl_secs = parse_env("REPORT_THRESHOLD_TTL_SECS", 300)?;
        let history_cycles = parse_env("REPORT_HISTORY_CYCLES", 6)?;

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            report: ReportConfig {
                image_concurrency,
                threshold_ttl: Duration::from_secs(threshold_ttl_secs as u64),
                history_cycles,
            },
        })
    }
}

fn parse_env(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue {
                key,
                reason: "must be a non-negative integer",
            }),
        Err(_) => Ok(default),
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs consumed by the report assembler and threshold resolver.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub image_concurrency: usize,
    pub threshold_ttl: Duration,
    pub history_cycles: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, reason } => {
                write!(f, "{key} {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
