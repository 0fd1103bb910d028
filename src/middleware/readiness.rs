use crate::error::DbError;
use crate::{VaultError, router::VaultState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Hold each request until the database has finished initializing.
///
/// Waits at most `state.ready_timeout`; past that the request fails with
/// 503 `NOT_READY` and the caller can retry. A failed initialization is
/// reported as 503 straight away.
pub async fn require_ready(
    State(state): State<VaultState>,
    req: Request,
    next: Next,
) -> Result<Response, VaultError> {
    if !state.db.is_ready() {
        match tokio::time::timeout(state.ready_timeout, state.db.await_ready()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, uri = %req.uri(), "rejecting request, database unavailable");
                return Err(e.into());
            }
            Err(_) => {
                warn!(uri = %req.uri(), "database still initializing");
                return Err(DbError::NotReady.into());
            }
        }
    }
    Ok(next.run(req).await)
}
