//! Copy every testimonial from the local SQLite file into PostgreSQL.

use testimonial_vault::config::Config;
use testimonial_vault::db::{BackendKind, Database, DbSettings};
use testimonial_vault::service::copy_submissions;
use tracing::{error, info};
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

    if cfg.database_url().is_none() {
        info!("DATABASE_URL not set; nothing to migrate");
        return Ok(());
    }

    let source_settings = DbSettings {
        database_url: None,
        ..cfg.db_settings()
    };
    if !source_settings.sqlite_path().exists() {
        info!(
            path = %source_settings.sqlite_path().display(),
            "no SQLite database found; nothing to migrate"
        );
        return Ok(());
    }

    let target = Database::connect(cfg.db_settings()).await?;
    if target.kind() != Some(BackendKind::ClientServer) {
        error!("could not reach PostgreSQL; aborting");
        target.close().await;
        std::process::exit(1);
    }
    let source = Database::connect(source_settings).await?;

    let report = copy_submissions(&source, &target).await;
    source.close().await;
    target.close().await;
    let report = report?;

    info!(
        copied = report.copied,
        skipped = report.skipped,
        failed = report.failed,
        "done"
    );
    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
