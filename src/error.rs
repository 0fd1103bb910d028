use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// Errors raised by the data-access layer.
#[derive(Debug, ThisError)]
pub enum DbError {
    /// A facade call arrived before backend selection and schema setup finished.
    #[error("database not ready")]
    NotReady,

    /// Initialization ran and failed; the readiness gate will never open.
    #[error("database initialization failed: {0}")]
    InitFailed(String),

    #[error("schema statement failed: {statement}: {source}")]
    Schema {
        statement: String,
        #[source]
        source: SqlxError,
    },

    #[error("Database error: {0}")]
    Backend(#[from] SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(String),

    /// The operation was called with a backend it cannot work on.
    #[error("unsupported backend: {0}")]
    WrongBackend(&'static str),
}

impl DbError {
    /// True for failures where the backend itself is unreachable or not set up yet.
    pub fn is_unavailable(&self) -> bool {
        match self {
            DbError::NotReady | DbError::InitFailed(_) | DbError::Io(_) => true,
            DbError::Backend(e) => !matches!(
                e,
                SqlxError::Database(_) | SqlxError::RowNotFound | SqlxError::ColumnNotFound(_)
            ),
            DbError::Schema { .. } | DbError::Decode(_) | DbError::WrongBackend(_) => false,
        }
    }
}

#[derive(Debug, ThisError)]
pub enum VaultError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl From<SqlxError> for VaultError {
    fn from(e: SqlxError) -> Self {
        VaultError::Db(DbError::Backend(e))
    }
}

impl IntoResponse for VaultError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            VaultError::Db(DbError::NotReady) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_READY",
                "Database not ready.".to_string(),
            ),
            VaultError::Db(e) if e.is_unavailable() => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                "Database is unavailable.".to_string(),
            ),
            VaultError::Db(_) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "The request could not be stored or read.".to_string(),
            ),
            VaultError::NotFound(what) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found"))
            }
            VaultError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            VaultError::Multipart(e) => (e.status(), "BAD_UPLOAD", e.body_text()),
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
