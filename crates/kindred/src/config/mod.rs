use std::env;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::matching::topics::DEFAULT_FALLBACK_INTERESTS;

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
    pub matching: MatchingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            matching: MatchingConfig::from_env()?,
        })
    }
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Survey pacing and question supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingConfig {
    /// Progress added per answered question; always divides 100.
    pub question_increment: u8,
    /// Question slots shown at once.
    pub queue_depth: usize,
    pub fallback_topics: Vec<String>,
    pub rng_seed: Option<u64>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            question_increment: 20,
            queue_depth: 5,
            fallback_topics: DEFAULT_FALLBACK_INTERESTS
                .iter()
                .map(|topic| topic.to_string())
                .collect(),
            rng_seed: None,
        }
    }
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("MATCH_QUESTION_INCREMENT") {
            config.question_increment = raw
                .trim()
                .parse::<u8>()
                .map_err(|_| ConfigError::InvalidIncrement { value: raw.clone() })?;
        }

        if let Ok(raw) = env::var("MATCH_QUEUE_DEPTH") {
            config.queue_depth = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|depth| *depth > 0)
                .ok_or(ConfigError::InvalidQueueDepth)?;
        }

        if let Ok(raw) = env::var("MATCH_RNG_SEED") {
            config.rng_seed = Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSeed)?,
            );
        }

        if let Ok(raw) = env::var("MATCH_FALLBACK_TOPICS") {
            config.fallback_topics = read_fallback_topics(PathBuf::from(raw))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let increment = self.question_increment;
        if increment == 0 || increment > 100 || 100 % increment != 0 {
            return Err(ConfigError::InvalidIncrement {
                value: increment.to_string(),
            });
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::InvalidQueueDepth);
        }
        if self.fallback_topics.iter().all(|topic| topic.trim().is_empty()) {
            return Err(ConfigError::EmptyFallbackTopics);
        }
        Ok(())
    }
}

fn read_fallback_topics(path: PathBuf) -> Result<Vec<String>, ConfigError> {
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::FallbackTopicsIo {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str::<Vec<String>>(&raw)
        .map_err(|source| ConfigError::FallbackTopicsFormat { path, source })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidIncrement { value: String },
    InvalidQueueDepth,
    InvalidSeed,
    EmptyFallbackTopics,
    FallbackTopicsIo { path: PathBuf, source: std::io::Error },
    FallbackTopicsFormat { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidIncrement { value } => write!(
                f,
                "MATCH_QUESTION_INCREMENT must be between 1 and 100 and divide 100 evenly (got '{}')",
                value
            ),
            ConfigError::InvalidQueueDepth => {
                write!(f, "MATCH_QUEUE_DEPTH must be a positive integer")
            }
            ConfigError::InvalidSeed => write!(f, "MATCH_RNG_SEED must be a valid u64"),
            ConfigError::EmptyFallbackTopics => {
                write!(f, "fallback topic list must contain at least one word")
            }
            ConfigError::FallbackTopicsIo { path, .. } => {
                write!(f, "failed to read fallback topics from {}", path.display())
            }
            ConfigError::FallbackTopicsFormat { path, .. } => write!(
                f,
                "fallback topics in {} must be a JSON array of strings",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::FallbackTopicsIo { source, .. } => Some(source),
            ConfigError::FallbackTopicsFormat { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidIncrement { .. }
            | ConfigError::InvalidQueueDepth
            | ConfigError::InvalidSeed
            | ConfigError::EmptyFallbackTopics => None,
        }
    }
}
