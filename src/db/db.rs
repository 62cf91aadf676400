// db/db.rs
use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

use super::{
    localdb::LocalStore,
    pgdb::PgStore,
    snapshot::{ChangeSet, Snapshot},
};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Local store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Local store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stale write rejected for {entity} {id}")]
    Conflict { entity: &'static str, id: Uuid },
}

/// Which backend is serving the core.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    Remote,
    Local,
    /// A remote store was configured but unreachable at startup.
    LocalFallback,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Remote => write!(f, "remote"),
            StorageMode::Local => write!(f, "local"),
            StorageMode::LocalFallback => write!(f, "local_fallback"),
        }
    }
}

/// Storage collaborator the ticket service persists through.
///
/// `commit` must apply the whole change set or nothing.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    async fn load_snapshot(&self) -> Result<Snapshot, StorageError>;

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StorageError>;

    fn mode(&self) -> StorageMode;
}

/// Picks the backend at startup.
///
/// With `DATABASE_URL` set the Postgres store is used; if it cannot be reached
/// the service keeps running on the local store in `LocalFallback` mode.
pub async fn connect_storage(config: &Config) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not configured - using local store");
        let store = LocalStore::open(config.local_store_path.clone(), StorageMode::Local).await?;
        return Ok(Arc::new(store));
    };

    let connected = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await;

    match connected {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            let store = PgStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        Err(err) => {
            tracing::warn!(
                "Failed to connect to the database: {}. Running in local fallback mode",
                err
            );
            let store =
                LocalStore::open(config.local_store_path.clone(), StorageMode::LocalFallback)
                    .await?;
            Ok(Arc::new(store))
        }
    }
}
