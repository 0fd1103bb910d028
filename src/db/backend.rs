//! The two store variants behind one interface, and the selector that picks
//! between them at startup.

use crate::db::postgres::ServerStore;
use crate::db::sqlite::EmbeddedStore;
use crate::db::value::{DbRow, DbValue};
use crate::error::DbError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Embedded,
    ClientServer,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Embedded => f.write_str("sqlite"),
            BackendKind::ClientServer => f.write_str("postgres"),
        }
    }
}

/// Everything the selector needs to open either store.
#[derive(Debug, Clone)]
pub struct DbSettings {
    /// PostgreSQL connection string; `None` goes straight to SQLite.
    pub database_url: Option<String>,
    /// Directory holding the SQLite file.
    pub data_dir: PathBuf,
    pub busy_timeout: Duration,
    pub pg_connect_timeout: Duration,
    pub pg_max_connections: u32,
}

impl DbSettings {
    pub const SQLITE_FILE: &'static str = "testimonials.db";

    /// Embedded-only settings rooted at `data_dir`.
    pub fn embedded(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: None,
            data_dir: data_dir.into(),
            busy_timeout: Duration::from_secs(30),
            pg_connect_timeout: Duration::from_secs(5),
            pg_max_connections: 10,
        }
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(Self::SQLITE_FILE)
    }
}

#[derive(Debug, Clone)]
pub enum Backend {
    Embedded(EmbeddedStore),
    ClientServer(ServerStore),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Embedded(_) => BackendKind::Embedded,
            Backend::ClientServer(_) => BackendKind::ClientServer,
        }
    }

    pub async fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, DbError> {
        match self {
            Backend::Embedded(s) => s.execute(sql, params).await,
            Backend::ClientServer(s) => s.execute(sql, params).await,
        }
    }

    pub async fn fetch_one(&self, sql: &str, params: &[DbValue]) -> Result<Option<DbRow>, DbError> {
        match self {
            Backend::Embedded(s) => s.fetch_one(sql, params).await,
            Backend::ClientServer(s) => s.fetch_one(sql, params).await,
        }
    }

    pub async fn fetch_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, DbError> {
        match self {
            Backend::Embedded(s) => s.fetch_all(sql, params).await,
            Backend::ClientServer(s) => s.fetch_all(sql, params).await,
        }
    }

    /// Compile `sql` and return the statement text to execute later.
    pub async fn compile(&self, sql: &str) -> Result<String, DbError> {
        match self {
            Backend::Embedded(s) => {
                s.compile(sql).await?;
                Ok(sql.to_string())
            }
            Backend::ClientServer(s) => s.compile(sql).await,
        }
    }

    /// Run a statement produced by [`Backend::compile`].
    pub(crate) async fn execute_compiled(
        &self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<u64, DbError> {
        match self {
            Backend::Embedded(s) => s.execute(sql, params).await,
            Backend::ClientServer(s) => s.execute_rewritten(sql, params).await,
        }
    }

    pub async fn close(&self) {
        match self {
            Backend::Embedded(s) => s.close().await,
            Backend::ClientServer(s) => s.close().await,
        }
    }
}

/// Pick and open the backend.
///
/// A configured connection string is tried exactly once; if connecting or the
/// probe fails the embedded store is opened instead and PostgreSQL is not
/// retried.
pub async fn select_backend(settings: &DbSettings) -> Result<Backend, DbError> {
    if let Some(url) = settings
        .database_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
    {
        info!("Using PostgreSQL database");
        match connect_server(url, settings).await {
            Ok(store) => {
                info!("PostgreSQL connected successfully");
                return Ok(Backend::ClientServer(store));
            }
            Err(e) => {
                warn!(error = %e, "PostgreSQL connection failed; falling back to SQLite");
            }
        }
    }

    let path = settings.sqlite_path();
    info!(path = %path.display(), "Using SQLite database");
    let store = EmbeddedStore::open(&path, settings.busy_timeout).await?;
    Ok(Backend::Embedded(store))
}

async fn connect_server(url: &str, settings: &DbSettings) -> Result<ServerStore, DbError> {
    let store =
        ServerStore::connect(url, settings.pg_max_connections, settings.pg_connect_timeout).await?;
    if let Err(e) = store.probe().await {
        store.close().await;
        return Err(e);
    }
    Ok(store)
}
