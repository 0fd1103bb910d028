use mimalloc::MiMalloc;
use testimonial_vault::config::Config;
use testimonial_vault::db::Database;
use testimonial_vault::router::{VaultState, vault_router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        postgres = cfg.database_url().is_some(),
        storage_root = %cfg.storage_root().display(),
        loglevel = %cfg.loglevel
    );

    // Legacy media is served from the database, but the migration tool still
    // reads from here.
    tokio::fs::create_dir_all(cfg.uploads_dir()).await?;

    // Requests arriving before initialization finishes get 503 NOT_READY.
    let db = Database::spawn(cfg.db_settings());

    let app = vault_router(VaultState::new(db.clone()));

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
