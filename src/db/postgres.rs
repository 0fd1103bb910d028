//! Client/server store: a pooled PostgreSQL connection reached through sqlx.
//!
//! All statements arrive in the `?` dialect and are rewritten here, never in
//! the embedded store.

use crate::db::placeholder::rewrite_placeholders;
use crate::db::value::{DbRow, DbValue, NullType};
use crate::error::DbError;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, Pool, Postgres, Row, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::debug;

pub type PgPool = Pool<Postgres>;

/// SQLSTATE `duplicate_column`.
const DUPLICATE_COLUMN: &str = "42701";

#[derive(Clone)]
pub struct ServerStore {
    pool: PgPool,
}

impl std::fmt::Debug for ServerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerStore").finish_non_exhaustive()
    }
}

impl ServerStore {
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Liveness probe issued once, right after connecting.
    pub async fn probe(&self) -> Result<(), DbError> {
        sqlx::query("SELECT NOW()").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, DbError> {
        let sql = rewrite_placeholders(sql);
        debug!(sql = %sql, "postgres execute");
        let done = bind_all(sqlx::query(&sql), params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// First row of the result set, or `None` when it is empty.
    pub async fn fetch_one(&self, sql: &str, params: &[DbValue]) -> Result<Option<DbRow>, DbError> {
        let sql = rewrite_placeholders(sql);
        debug!(sql = %sql, "postgres fetch_one");
        let row = bind_all(sqlx::query(&sql), params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    pub async fn fetch_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, DbError> {
        let sql = rewrite_placeholders(sql);
        debug!(sql = %sql, "postgres fetch_all");
        let rows = bind_all(sqlx::query(&sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    /// Rewrite and compile the statement; returns the text `run` will send.
    pub async fn compile(&self, sql: &str) -> Result<String, DbError> {
        let sql = rewrite_placeholders(sql).into_owned();
        (&self.pool).prepare(&sql).await?;
        Ok(sql)
    }

    /// Execute a statement that was already rewritten by [`ServerStore::compile`].
    pub async fn execute_rewritten(&self, sql: &str, params: &[DbValue]) -> Result<u64, DbError> {
        let done = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_duplicate_column(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(DUPLICATE_COLUMN))
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [DbValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            DbValue::Null(NullType::Text) => query.bind(None::<String>),
            DbValue::Null(NullType::Integer) => query.bind(None::<i64>),
            DbValue::Null(NullType::Real) => query.bind(None::<f64>),
            DbValue::Null(NullType::Blob) => query.bind(None::<Vec<u8>>),
            DbValue::Null(NullType::Boolean) => query.bind(None::<bool>),
            DbValue::Null(NullType::Timestamp) => query.bind(None::<DateTime<Utc>>),
            DbValue::Integer(v) => query.bind(*v),
            DbValue::Real(v) => query.bind(*v),
            DbValue::Text(v) => query.bind(v.as_str()),
            DbValue::Blob(v) => query.bind(v.as_slice()),
            DbValue::Boolean(v) => query.bind(*v),
            DbValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<DbRow, DbError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            DbValue::NULL
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "BOOL" => DbValue::Boolean(row.try_get(idx)?),
                "INT2" => DbValue::Integer(row.try_get::<i16, _>(idx)?.into()),
                "INT4" => DbValue::Integer(row.try_get::<i32, _>(idx)?.into()),
                "INT8" => DbValue::Integer(row.try_get(idx)?),
                "FLOAT4" => DbValue::Real(row.try_get::<f32, _>(idx)?.into()),
                "FLOAT8" => DbValue::Real(row.try_get(idx)?),
                "BYTEA" => DbValue::Blob(row.try_get(idx)?),
                "TIMESTAMPTZ" => DbValue::Timestamp(row.try_get(idx)?),
                "TIMESTAMP" => DbValue::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?.and_utc()),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
                    DbValue::Text(row.try_get(idx)?)
                }
                other => {
                    return Err(DbError::Decode(format!(
                        "column `{}` has unsupported type {other}",
                        column.name()
                    )));
                }
            }
        };
        columns.push(column.name().to_string());
        values.push(value);
    }

    Ok(DbRow::new(columns, values))
}
