use crate::db::Database;
use crate::handlers::{MAX_UPLOAD_BYTES, assets, health, testimonials};
use crate::middleware::require_ready;
use crate::service::{AssetStore, SubmissionStore};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::time::Duration;

/// How long a request waits for database initialization before 503.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared handler state. The stores are cheap clones over the same
/// [`Database`].
#[derive(Clone, Debug)]
pub struct VaultState {
    pub db: Database,
    pub submissions: SubmissionStore,
    pub assets: AssetStore,
    pub ready_timeout: Duration,
}

impl VaultState {
    pub fn new(db: Database) -> Self {
        Self {
            submissions: SubmissionStore::new(db.clone()),
            assets: AssetStore::new(db.clone()),
            db,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }
}

pub fn vault_router(state: VaultState) -> Router {
    let uploads = Router::new()
        .route("/submit-photo-testimonial", post(testimonials::submit_photo))
        .route("/submit-video-testimonial", post(testimonials::submit_video))
        .route("/api/assets/upload", post(assets::upload_asset))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/testimonials", get(testimonials::list_testimonials))
        .route(
            "/api/testimonial/{uuid}",
            get(testimonials::get_testimonial).delete(testimonials::delete_testimonial),
        )
        .route(
            "/submit-written-testimonial",
            post(testimonials::submit_written),
        )
        .route("/uploads/{filename}", get(testimonials::serve_upload))
        .route("/api/assets", get(assets::list_assets))
        .route(
            "/api/assets/{uuid}",
            get(assets::get_asset)
                .put(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route("/assets/{uuid}", get(assets::serve_asset))
        .merge(uploads)
        .layer(from_fn_with_state(state.clone(), require_ready))
        .with_state(state)
}
