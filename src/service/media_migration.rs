//! One-time fold of legacy on-disk uploads into `testimonials.media_data`.

use crate::db::Database;
use crate::error::DbError;
use crate::params;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files read and written concurrently.
const MIGRATION_CONCURRENCY: usize = 4;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MediaMigrationReport {
    /// Rows with a filename and no bytes when the run started.
    pub pending: usize,
    pub migrated: usize,
    /// Rows whose file was not found under the uploads directory.
    pub missing: usize,
    /// Read or update failures.
    pub failed: usize,
    /// Original files deleted after their bytes were stored.
    pub removed: usize,
}

#[derive(Debug)]
struct LegacyRow {
    id: i64,
    media_file: String,
}

enum Outcome {
    Migrated(PathBuf),
    Missing,
    Failed,
}

/// Move every legacy upload into the database.
///
/// A row is only touched when its file exists and can be read; the original
/// is removed (when `remove_originals` is set) only after the update succeeded.
pub async fn migrate_legacy_media(
    db: &Database,
    uploads_dir: &Path,
    remove_originals: bool,
) -> Result<MediaMigrationReport, DbError> {
    let rows = db
        .fetch_all(
            "SELECT id, uuid, media_file, media_type FROM testimonials \
             WHERE media_file IS NOT NULL AND media_data IS NULL",
            &params![],
        )
        .await?;

    let legacy: Vec<LegacyRow> = rows
        .iter()
        .filter_map(|row| {
            let parsed = row.get_i64("id").and_then(|id| {
                Ok(id.zip(row.get_string("media_file")?)
                    .map(|(id, media_file)| LegacyRow { id, media_file }))
            });
            parsed
                .inspect_err(|e| warn!(error = %e, "skipping unreadable legacy row"))
                .ok()
                .flatten()
        })
        .collect();

    let mut report = MediaMigrationReport {
        pending: legacy.len(),
        ..Default::default()
    };
    info!(count = report.pending, uploads = %uploads_dir.display(), "legacy media rows found");
    if legacy.is_empty() {
        return Ok(report);
    }

    let outcomes: Vec<Outcome> = stream::iter(legacy)
        .map(|row| migrate_one(db, uploads_dir, row))
        .buffer_unordered(MIGRATION_CONCURRENCY)
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            Outcome::Migrated(path) => {
                report.migrated += 1;
                if remove_originals {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => report.removed += 1,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "could not remove original")
                        }
                    }
                }
            }
            Outcome::Missing => report.missing += 1,
            Outcome::Failed => report.failed += 1,
        }
    }

    info!(
        migrated = report.migrated,
        missing = report.missing,
        failed = report.failed,
        removed = report.removed,
        "media migration complete"
    );
    Ok(report)
}

async fn migrate_one(db: &Database, uploads_dir: &Path, row: LegacyRow) -> Outcome {
    let Some(path) = upload_path(uploads_dir, &row.media_file) else {
        warn!(media_file = %row.media_file, "refusing path outside uploads directory");
        return Outcome::Failed;
    };

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(media_file = %row.media_file, "file not found");
            return Outcome::Missing;
        }
        Err(e) => {
            warn!(media_file = %row.media_file, error = %e, "failed to read file");
            return Outcome::Failed;
        }
    };

    match db
        .execute(
            "UPDATE testimonials SET media_data = ? WHERE id = ?",
            &params![data, row.id],
        )
        .await
    {
        Ok(_) => {
            info!(media_file = %row.media_file, "migrated");
            Outcome::Migrated(path)
        }
        Err(e) => {
            warn!(media_file = %row.media_file, error = %e, "failed to store media");
            Outcome::Failed
        }
    }
}

/// Resolve a stored filename inside `uploads_dir`, rejecting anything that
/// is not a bare file name.
fn upload_path(uploads_dir: &Path, media_file: &str) -> Option<PathBuf> {
    let name = Path::new(media_file);
    let bare = name.file_name()?;
    (bare == name.as_os_str()).then(|| uploads_dir.join(bare))
}
