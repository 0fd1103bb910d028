//! Copy submissions from a SQLite store into PostgreSQL.

use crate::db::{BackendKind, Database, DbRow, DbValue};
use crate::error::DbError;
use crate::params;
use serde::Serialize;
use tracing::{info, warn};

const COPIED_COLUMNS: &[&str] = &[
    "uuid",
    "name",
    "email",
    "testimonial_text",
    "media_file",
    "media_type",
    "media_data",
    "first_name",
    "last_name",
    "current_flight_time",
    "past_flight_time",
    "use_case",
    "weather_type",
    "extreme_conditions",
    "reason_for_flying",
    "testimonial_type",
    "created_at",
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub copied: usize,
    /// Rows whose uuid already exists in the target.
    pub skipped: usize,
    pub failed: usize,
}

/// Copy every row of `source.testimonials` into `target`, leaving rows the
/// target already has (matched by uuid) alone. Per-row failures are counted
/// and logged; only failing to read the source aborts the run.
pub async fn copy_submissions(source: &Database, target: &Database) -> Result<CopyReport, DbError> {
    if source.kind() != Some(BackendKind::Embedded) {
        return Err(DbError::WrongBackend("copy source must be the SQLite store"));
    }
    if target.kind() != Some(BackendKind::ClientServer) {
        return Err(DbError::WrongBackend("copy target must be PostgreSQL"));
    }

    let rows = source
        .fetch_all("SELECT * FROM testimonials ORDER BY id", &params![])
        .await?;
    info!(count = rows.len(), "testimonials to migrate");

    let insert_sql = format!(
        "INSERT INTO testimonials ({}) VALUES ({})",
        COPIED_COLUMNS.join(", "),
        vec!["?"; COPIED_COLUMNS.len()].join(", ")
    );
    let insert = target.prepare(&insert_sql).await?;

    let mut report = CopyReport::default();
    for row in &rows {
        let uuid = match row.require_string("uuid") {
            Ok(uuid) => uuid,
            Err(e) => {
                warn!(error = %e, "row without uuid");
                report.failed += 1;
                continue;
            }
        };

        match target
            .fetch_one("SELECT id FROM testimonials WHERE uuid = ?", &params![uuid.as_str()])
            .await
        {
            Ok(Some(_)) => {
                info!(uuid = %uuid, "skipping existing record");
                report.skipped += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(uuid = %uuid, error = %e, "lookup in target failed");
                report.failed += 1;
                continue;
            }
        }

        let values = match copy_values(row) {
            Ok(values) => values,
            Err(e) => {
                warn!(uuid = %uuid, error = %e, "row could not be converted");
                report.failed += 1;
                continue;
            }
        };
        match insert.run(&values).await {
            Ok(()) => {
                info!(uuid = %uuid, "migrated");
                report.copied += 1;
            }
            Err(e) => {
                warn!(uuid = %uuid, error = %e, "insert into target failed");
                report.failed += 1;
            }
        }
    }

    info!(
        copied = report.copied,
        skipped = report.skipped,
        failed = report.failed,
        "migration to PostgreSQL complete"
    );
    Ok(report)
}

/// SQLite hands back loosely typed values; PostgreSQL wants them matching
/// the column types.
fn copy_values(row: &DbRow) -> Result<Vec<DbValue>, DbError> {
    COPIED_COLUMNS
        .iter()
        .map(|&column| {
            Ok(match column {
                "media_data" => row.get_bytes(column)?.map(<[u8]>::to_vec).into(),
                "created_at" => row.get_timestamp(column)?.into(),
                _ => row.get_string(column)?.into(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbSettings, NullType};

    #[test]
    fn copy_values_types_each_column() {
        let row = DbRow::new(
            vec![
                "uuid".into(),
                "name".into(),
                "media_data".into(),
                "created_at".into(),
            ],
            vec![
                DbValue::Text("u".into()),
                DbValue::Text("n".into()),
                DbValue::NULL,
                DbValue::Text("2024-02-03 04:05:06".into()),
            ],
        );
        let values = copy_values(&row).unwrap();
        assert_eq!(values.len(), COPIED_COLUMNS.len());
        assert_eq!(values[0], DbValue::Text("u".into()));
        assert_eq!(values[6], DbValue::Null(NullType::Blob));
        assert!(matches!(values[16], DbValue::Timestamp(_)));
        // Absent questionnaire columns become typed text NULLs.
        assert_eq!(values[7], DbValue::Null(NullType::Text));
    }

    #[tokio::test]
    async fn refuses_wrong_backends() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(DbSettings::embedded(dir.path())).await.unwrap();
        let err = copy_submissions(&db, &db).await.unwrap_err();
        assert!(matches!(err, DbError::WrongBackend(_)));
        assert!(!err.is_unavailable());
    }
}
