use chrono::Duration;
use thiserror::Error;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TASKNEST_JWT_SECRET must be set")]
    MissingJwtSecret,
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub ai: Option<AiConfig>,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "PORT",
                    value: raw,
                })?,
            Err(_) => 3000,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://tasknest.sqlite?mode=rwc".to_string());

        let jwt_secret = match std::env::var("TASKNEST_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if cfg!(debug_assertions) => {
                tracing::warn!("TASKNEST_JWT_SECRET not set, using a development-only secret");
                "tasknest-dev-secret".to_string()
            }
            _ => return Err(ConfigError::MissingJwtSecret),
        };

        let token_ttl_hours = match std::env::var("TASKNEST_TOKEN_TTL_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "TASKNEST_TOKEN_TTL_HOURS",
                    value: raw,
                })?,
            Err(_) => DEFAULT_TOKEN_TTL_HOURS,
        };

        let ai = std::env::var("TASKNEST_AI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| AiConfig {
                api_key,
                base_url: std::env::var("TASKNEST_AI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_AI_BASE_URL.to_string()),
            });

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            token_ttl: Duration::hours(token_ttl_hours),
            ai,
        })
    }
}
