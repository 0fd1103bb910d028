//! Fold legacy upload files into `testimonials.media_data`.

use testimonial_vault::config::Config;
use testimonial_vault::db::Database;
use testimonial_vault::service::migrate_legacy_media;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cfg = Config::load()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone())),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let db = Database::connect(cfg.db_settings()).await?;
    info!(backend = ?db.kind(), uploads = %cfg.uploads_dir().display(), "starting media migration");

    let report = migrate_legacy_media(&db, &cfg.uploads_dir(), cfg.remove_migrated_files).await;
    db.close().await;
    let report = report?;

    info!(
        pending = report.pending,
        migrated = report.migrated,
        missing = report.missing,
        failed = report.failed,
        removed = report.removed,
        "done"
    );
    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
