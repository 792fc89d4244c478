use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::evaluation::{AppEnvironment, UnknownEnvironment, DEFAULT_PREFIX, DEFAULT_REMOTE_TIMEOUT};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: AppEnvironment,
    pub jwt_secret: Option<String>,
    pub overrides_url: Option<String>,
    pub overrides_timeout: Duration,
    pub flag_env_prefix: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT missing, it is required")]
    MissingPort,

    #[error("{name} must be a valid number, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },

    #[error(transparent)]
    Environment(#[from] UnknownEnvironment),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port_raw = var("PORT").ok_or(ConfigError::MissingPort)?;
        let port = port_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber {
                name: "PORT",
                value: port_raw.clone(),
            })?;

        let environment = match var("APP_ENV") {
            Some(raw) => raw.parse::<AppEnvironment>()?,
            None => AppEnvironment::default(),
        };

        let overrides_timeout = match var("FLAG_OVERRIDES_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "FLAG_OVERRIDES_TIMEOUT_MS",
                    value: raw.clone(),
                })?,
            None => DEFAULT_REMOTE_TIMEOUT,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            environment,
            jwt_secret: var("JWT_SECRET"),
            overrides_url: var("FLAG_OVERRIDES_URL"),
            overrides_timeout,
            flag_env_prefix: var("FLAG_ENV_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
