//! Database module: dual-backend data access for testimonials and assets.
//!
//! Layout:
//! - `database.rs`: the `Database` context and its query facade
//! - `backend.rs`: the SQLite | PostgreSQL variants and the startup selector
//! - `sqlite.rs` / `postgres.rs`: one store per engine
//! - `placeholder.rs`: `?` → `$n` rewrite used by the PostgreSQL store
//! - `gate.rs`: one-shot readiness signal
//! - `schema.rs`: DDL per dialect plus additive column list
//! - `value.rs`: backend-neutral parameters and rows
//! - `models.rs`: typed views over `testimonials` and `assets` rows

pub mod backend;
pub mod database;
pub mod gate;
pub mod models;
pub mod placeholder;
pub mod postgres;
pub mod schema;
pub mod sqlite;
pub mod value;

pub use backend::{Backend, BackendKind, DbSettings};
pub use database::{Database, Prepared};
pub use models::{Asset, Questionnaire, StoredFile, Submission, SubmissionKind};
pub use placeholder::rewrite_placeholders;
pub use value::{DbRow, DbValue, NullType};
