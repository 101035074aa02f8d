use dotenvy::dotenv;
use std::env;

pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";
pub const DEFAULT_POOL_SIZE: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env")]
    Missing(&'static str),
    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Server settings read from the environment. Site address and asset paths come from the
/// leptos configuration instead.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub admin_password: String,
    pub cors_origins: Vec<String>,
    pub pool_size: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = required("DATABASE_URL")?;
        let admin_password = required("ADMIN_PASSWORD")?;
        let cors_origins = parse_origins(
            &lookup("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
        );
        let pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidNumber {
                    name: "DATABASE_POOL_SIZE",
                    value,
                })?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(ServerConfig {
            database_url,
            admin_password,
            cors_origins,
            pool_size,
        })
    }
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
