//! Embedded store: a single SQLite file reached through sqlx.

use crate::db::value::{DbRow, DbValue};
use crate::error::DbError;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Executor, Pool, Row, Sqlite, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

/// Same shape as the `strftime('%Y-%m-%d %H:%M:%f', 'now')` column defaults,
/// so text comparisons against server-assigned timestamps stay ordered.
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One shared connection; SQLite serializes writers itself and the busy
/// timeout absorbs lock contention from other processes.
#[derive(Clone)]
pub struct EmbeddedStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl std::fmt::Debug for EmbeddedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EmbeddedStore {
    /// Open (or create) the database file, creating its directory first.
    pub async fn open(path: &Path, busy_timeout: Duration) -> Result<Self, DbError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_opts)
            .await?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, DbError> {
        debug!(sql, "sqlite execute");
        let done = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    pub async fn fetch_one(&self, sql: &str, params: &[DbValue]) -> Result<Option<DbRow>, DbError> {
        debug!(sql, "sqlite fetch_one");
        let row = bind_all(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    pub async fn fetch_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, DbError> {
        debug!(sql, "sqlite fetch_all");
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    /// Compile the statement once so syntax errors surface at prepare time.
    /// sqlx keeps the compiled statement in the connection's cache for `run`.
    pub async fn compile(&self, sql: &str) -> Result<(), DbError> {
        (&self.pool).prepare(sql).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// `ALTER TABLE ... ADD COLUMN` on a column that is already there.
    pub fn is_duplicate_column(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.message().contains("duplicate column name"))
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [DbValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            DbValue::Null(_) => query.bind(None::<String>),
            DbValue::Integer(v) => query.bind(*v),
            DbValue::Real(v) => query.bind(*v),
            DbValue::Text(v) => query.bind(v.as_str()),
            DbValue::Blob(v) => query.bind(v.as_slice()),
            DbValue::Boolean(v) => query.bind(*v),
            DbValue::Timestamp(v) => query.bind(v.format(SQLITE_TIMESTAMP_FORMAT).to_string()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<DbRow, DbError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            DbValue::NULL
        } else {
            // Storage class of the value itself, not the declared column type.
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => DbValue::Integer(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" => DbValue::Real(row.try_get_unchecked::<f64, _>(idx)?),
                "BLOB" => DbValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                _ => DbValue::Text(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        columns.push(column.name().to_string());
        values.push(value);
    }

    Ok(DbRow::new(columns, values))
}
