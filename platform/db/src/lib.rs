//! Persistence for console actors and the records that produce them.
//!
//! Rows are stored with plain string literals; they become typed actors only
//! through [`load_actor`], which is where malformed records are rejected.

use std::time::Duration;

use platform_authz::{ApprovalError, ParseError};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

mod admins;
mod guards;
mod profiles;
mod projects;

pub use admins::{
    approve_admin_request, bootstrap_super_admin, find_admin, list_admin_requests, list_admins,
    reject_admin_request, set_admin_active, submit_admin_request, update_admin_access,
};
pub use guards::{NewGuard, create_guard, delete_guard, find_guard, list_guards};
pub use profiles::{admin_actor_from_model, load_actor};
pub use projects::{Project, create_project, list_projects};

/// Shared connection pool.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("stored record {id} is malformed: {reason}")]
    Corrupt { id: Uuid, reason: String },
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<ParseError> for DbError {
    fn from(value: ParseError) -> Self {
        DbError::InvalidInput(value.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
    #[serde(default = "default_max_connections")]
    max_connections: u32,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            env_key: default_url_key(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            ..Self::default()
        }
    }

    /// Reads `DATABASE_MAX_CONNECTIONS` on top of the defaults.
    pub fn from_env() -> Self {
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(default_max_connections);
        Self {
            max_connections,
            ..Self::default()
        }
    }

    pub fn database_url(&self) -> Result<String, DbError> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    connect_url(&url, settings.max_connections).await
}

pub async fn connect_url(url: &str, max_connections: u32) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let pool = Database::connect(options).await?;
    info!(max_connections, "database pool ready");
    Ok(pool)
}
