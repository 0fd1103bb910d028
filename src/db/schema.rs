//! SQL DDL for the `testimonials` and `assets` tables, one dialect per backend.
//!
//! The schema only grows: tables are created if missing and later columns are
//! added with `ALTER TABLE ... ADD COLUMN`, tolerating "already exists".

use crate::db::backend::{Backend, BackendKind};
use crate::db::postgres::ServerStore;
use crate::db::sqlite::EmbeddedStore;
use crate::error::DbError;
use tracing::{debug, info};

pub const SQLITE_TABLES: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS testimonials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    testimonial_text TEXT,
    media_file TEXT,
    media_type TEXT,
    media_data BLOB,
    first_name TEXT,
    last_name TEXT,
    current_flight_time TEXT,
    past_flight_time TEXT,
    use_case TEXT,
    weather_type TEXT,
    extreme_conditions TEXT,
    reason_for_flying TEXT,
    testimonial_type TEXT NOT NULL,
    created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
)"#,
    r#"
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    asset_type TEXT NOT NULL,
    file_name TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    file_data BLOB NOT NULL,
    file_size INTEGER,
    created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
)"#,
];

pub const POSTGRES_TABLES: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS testimonials (
    id SERIAL PRIMARY KEY,
    uuid TEXT UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    testimonial_text TEXT,
    media_file TEXT,
    media_type TEXT,
    media_data BYTEA,
    first_name TEXT,
    last_name TEXT,
    current_flight_time TEXT,
    past_flight_time TEXT,
    use_case TEXT,
    weather_type TEXT,
    extreme_conditions TEXT,
    reason_for_flying TEXT,
    testimonial_type TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#,
    r#"
CREATE TABLE IF NOT EXISTS assets (
    id SERIAL PRIMARY KEY,
    uuid TEXT UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    asset_type TEXT NOT NULL,
    file_name TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    file_data BYTEA NOT NULL,
    file_size INTEGER,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#,
];

/// A column introduced after the first deployment.
#[derive(Debug, Clone, Copy)]
pub struct AddedColumn {
    pub table: &'static str,
    pub column: &'static str,
    pub sqlite_type: &'static str,
    pub postgres_type: &'static str,
}

/// Append-only. Never remove or rename an entry.
pub const ADDED_COLUMNS: &[AddedColumn] = &[
    AddedColumn {
        table: "testimonials",
        column: "media_data",
        sqlite_type: "BLOB",
        postgres_type: "BYTEA",
    },
    AddedColumn {
        table: "testimonials",
        column: "reason_for_flying",
        sqlite_type: "TEXT",
        postgres_type: "TEXT",
    },
];

impl AddedColumn {
    pub fn ddl(&self, kind: BackendKind) -> String {
        let ty = match kind {
            BackendKind::Embedded => self.sqlite_type,
            BackendKind::ClientServer => self.postgres_type,
        };
        format!("ALTER TABLE {} ADD COLUMN {} {}", self.table, self.column, ty)
    }
}

/// Create missing tables and columns on whichever backend was selected.
/// Safe to run against a store that already has the full schema.
pub async fn ensure_schema(backend: &Backend) -> Result<(), DbError> {
    let kind = backend.kind();
    let tables = match kind {
        BackendKind::Embedded => SQLITE_TABLES,
        BackendKind::ClientServer => POSTGRES_TABLES,
    };

    for stmt in tables {
        run_ddl(backend, stmt.trim())
            .await
            .map_err(|source| DbError::Schema {
                statement: first_line(stmt),
                source,
            })?;
    }

    for added in ADDED_COLUMNS {
        let ddl = added.ddl(kind);
        match run_ddl(backend, &ddl).await {
            Ok(()) => info!(table = added.table, column = added.column, "column added"),
            Err(e) if is_duplicate_column(kind, &e) => {
                debug!(table = added.table, column = added.column, "column already present");
            }
            Err(source) => {
                return Err(DbError::Schema {
                    statement: ddl,
                    source,
                });
            }
        }
    }

    info!(backend = %kind, "schema ready");
    Ok(())
}

async fn run_ddl(backend: &Backend, stmt: &str) -> Result<(), sqlx::Error> {
    match backend {
        Backend::Embedded(store) => sqlx::query(stmt).execute(store.pool()).await.map(drop),
        Backend::ClientServer(store) => sqlx::query(stmt).execute(store.pool()).await.map(drop),
    }
}

fn is_duplicate_column(kind: BackendKind, err: &sqlx::Error) -> bool {
    match kind {
        BackendKind::Embedded => EmbeddedStore::is_duplicate_column(err),
        BackendKind::ClientServer => ServerStore::is_duplicate_column(err),
    }
}

fn first_line(stmt: &str) -> String {
    stmt.trim().lines().next().unwrap_or_default().to_string()
}
