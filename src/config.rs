use chrono::FixedOffset;
use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    pub fact_store: FactStoreKind,
    pub database_path: Option<String>,
    pub fact_store_url: Option<String>,
    pub fact_store_api_key: Option<String>,
    /// Business timezone the period resolver computes day boundaries in.
    pub utc_offset: FixedOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactStoreKind {
    Sqlite,
    Rest,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let bind_addr = env_map
            .get("BIND_ADDR")
            .map(|s| s.as_str())
            .unwrap_or("127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BIND_ADDR".to_string(),
                    "must be an IP address".to_string(),
                )
            })?;

        let fact_store = match env_map
            .get("FACT_STORE")
            .map(|s| s.as_str())
            .unwrap_or("sqlite")
        {
            "sqlite" => FactStoreKind::Sqlite,
            "rest" => FactStoreKind::Rest,
            other => {
                return Err(ConfigError::InvalidValue(
                    "FACT_STORE".to_string(),
                    format!("must be sqlite or rest, got {}", other),
                ))
            }
        };

        let database_path = non_empty(&env_map, "DATABASE_PATH");
        let fact_store_url = non_empty(&env_map, "FACT_STORE_URL");
        let fact_store_api_key = non_empty(&env_map, "FACT_STORE_API_KEY");

        match fact_store {
            FactStoreKind::Sqlite if database_path.is_none() => {
                return Err(ConfigError::MissingEnv("DATABASE_PATH".to_string()))
            }
            FactStoreKind::Rest if fact_store_url.is_none() => {
                return Err(ConfigError::MissingEnv("FACT_STORE_URL".to_string()))
            }
            _ => {}
        }

        let utc_offset = env_map
            .get("UTC_OFFSET_MINUTES")
            .map(|s| s.as_str())
            .unwrap_or("-240")
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|m| m.abs() <= MAX_OFFSET_MINUTES)
            .and_then(|m| FixedOffset::east_opt(m * 60))
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "UTC_OFFSET_MINUTES".to_string(),
                    "must be an integer within ±840".to_string(),
                )
            })?;

        Ok(Config {
            port,
            bind_addr,
            fact_store,
            database_path,
            fact_store_url,
            fact_store_api_key,
            utc_offset,
        })
    }
}

fn non_empty(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
