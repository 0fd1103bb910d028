//! The query facade: one `Database` value per process, cloned into every
//! caller.

use crate::db::backend::{Backend, BackendKind, DbSettings, select_backend};
use crate::db::gate::ReadinessGate;
use crate::db::schema::ensure_schema;
use crate::db::value::{DbRow, DbValue};
use crate::error::DbError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

struct Inner {
    settings: DbSettings,
    started: AtomicBool,
    backend: OnceLock<Backend>,
    gate: ReadinessGate,
}

/// Connection context plus the five-operation facade.
///
/// Cloning is cheap and every clone shares the same backend and gate.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("kind", &self.kind())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Database {
    /// Build an uninitialized context. Nothing is opened until
    /// [`Database::initialize`] runs.
    pub fn new(settings: DbSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                started: AtomicBool::new(false),
                backend: OnceLock::new(),
                gate: ReadinessGate::new(),
            }),
        }
    }

    /// Build the context and start initialization in the background.
    /// Callers use [`Database::await_ready`] before their first query.
    pub fn spawn(settings: DbSettings) -> Self {
        let db = Self::new(settings);
        let bg = db.clone();
        tokio::spawn(async move {
            if let Err(e) = bg.initialize().await {
                error!(error = %e, "database initialization failed");
            }
        });
        db
    }

    /// Build the context and wait for it to become ready.
    pub async fn connect(settings: DbSettings) -> Result<Self, DbError> {
        let db = Self::new(settings);
        db.initialize().await?;
        Ok(db)
    }

    /// Select the backend and ensure the schema, at most once per context.
    ///
    /// Concurrent and later callers do not start a second sequence; they wait
    /// for the first one's outcome.
    pub async fn initialize(&self) -> Result<BackendKind, DbError> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            self.await_ready().await?;
            return self.kind().ok_or(DbError::NotReady);
        }

        match self.run_init().await {
            Ok(backend) => {
                let kind = backend.kind();
                // `started` guarantees this is the only writer.
                let _ = self.inner.backend.set(backend);
                self.inner.gate.open();
                info!(backend = %kind, "database ready");
                Ok(kind)
            }
            Err(e) => {
                self.inner.gate.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_init(&self) -> Result<Backend, DbError> {
        let backend = select_backend(&self.inner.settings).await?;
        if let Err(e) = ensure_schema(&backend).await {
            backend.close().await;
            return Err(e);
        }
        Ok(backend)
    }

    /// Resolves once initialization has finished; immediately if it already has.
    pub async fn await_ready(&self) -> Result<(), DbError> {
        self.inner.gate.wait().await
    }

    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_open()
    }

    /// The selected backend kind, once ready.
    pub fn kind(&self) -> Option<BackendKind> {
        self.ready_backend().ok().map(Backend::kind)
    }

    fn ready_backend(&self) -> Result<&Backend, DbError> {
        self.inner.gate.check()?;
        self.inner.backend.get().ok_or(DbError::NotReady)
    }

    /// Run a statement that returns no rows; yields the affected-row count.
    pub async fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, DbError> {
        self.ready_backend()?.execute(sql, params).await
    }

    /// At most one row; `Ok(None)` when nothing matched.
    pub async fn fetch_one(&self, sql: &str, params: &[DbValue]) -> Result<Option<DbRow>, DbError> {
        self.ready_backend()?.fetch_one(sql, params).await
    }

    /// Every matching row in the order the backend returns them. Never fails
    /// just because nothing matched.
    pub async fn fetch_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, DbError> {
        self.ready_backend()?.fetch_all(sql, params).await
    }

    /// Compile a statement now and bind its parameters later.
    pub async fn prepare(&self, sql: &str) -> Result<Prepared, DbError> {
        let backend = self.ready_backend()?;
        let sql = backend.compile(sql).await?;
        Ok(Prepared {
            backend: backend.clone(),
            sql,
        })
    }

    /// Close the underlying pool. Later calls fail with the driver's
    /// closed-pool error.
    pub async fn close(&self) {
        if let Some(backend) = self.inner.backend.get() {
            backend.close().await;
        }
    }
}

/// A statement compiled by [`Database::prepare`], already in the backend's
/// placeholder dialect.
#[derive(Debug, Clone)]
pub struct Prepared {
    backend: Backend,
    sql: String,
}

impl Prepared {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub async fn run(&self, params: &[DbValue]) -> Result<(), DbError> {
        self.backend.execute_compiled(&self.sql, params).await?;
        Ok(())
    }
}
