// config.rs
use std::path::PathBuf;

use anyhow::{anyhow, Context};

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Unset means the in-memory store.
    pub database_url: Option<String>,
    /// JSON mirror for the in-memory store, if any.
    pub local_store_path: Option<PathBuf>,
    pub jwt_secret: String,
    pub port: u16,
    pub database_max_connections: u32,
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET_KEY")
            .ok_or_else(|| anyhow!("JWT_SECRET_KEY must be set"))?;

        let port = match non_empty("PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port, got {v:?}"))?,
            None => 8000,
        };

        let database_max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a number, got {v:?}"))?,
            None => 10,
        };

        Ok(Config {
            database_url: non_empty("DATABASE_URL"),
            local_store_path: non_empty("LOCAL_STORE_PATH").map(PathBuf::from),
            jwt_secret,
            port,
            database_max_connections,
        })
    }
}
