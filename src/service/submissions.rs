use crate::db::models::{SUBMISSION_COLUMNS, StoredFile, Submission, SubmissionKind};
use crate::db::{Database, Questionnaire};
use crate::error::DbError;
use crate::params;
use tracing::info;
use uuid::Uuid;

/// Media attached to a photo or video submission.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub name: String,
    pub email: String,
    pub testimonial_text: Option<String>,
    pub questionnaire: Questionnaire,
    pub kind: SubmissionKind,
    pub media: Option<MediaUpload>,
}

/// Typed access to the `testimonials` table through the query facade.
#[derive(Clone, Debug)]
pub struct SubmissionStore {
    db: Database,
}

impl SubmissionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a submission and return its generated uuid.
    pub async fn insert(&self, new: NewSubmission) -> Result<String, DbError> {
        let uuid = Uuid::new_v4().to_string();
        let q = new.questionnaire;
        let (media_file, media_type, media_data) = match new.media {
            Some(m) => (Some(m.file_name), Some(m.mime_type), Some(m.data)),
            None => (None, None, None),
        };

        let stmt = self
            .db
            .prepare(
                r#"INSERT INTO testimonials (
                    uuid, name, email, testimonial_text, media_file, media_type, media_data,
                    first_name, last_name, current_flight_time, past_flight_time, use_case,
                    weather_type, extreme_conditions, reason_for_flying, testimonial_type
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .await?;
        stmt.run(&params![
            uuid.as_str(),
            new.name,
            new.email,
            new.testimonial_text,
            media_file,
            media_type,
            media_data,
            q.first_name,
            q.last_name,
            q.current_flight_time,
            q.past_flight_time,
            q.use_case,
            q.weather_type,
            q.extreme_conditions,
            q.reason_for_flying,
            new.kind.as_str(),
        ])
        .await?;

        info!(uuid = %uuid, kind = %new.kind, "testimonial stored");
        Ok(uuid)
    }

    /// All submissions, newest first.
    pub async fn list(&self) -> Result<Vec<Submission>, DbError> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM testimonials ORDER BY created_at DESC, id DESC"
        );
        self.db
            .fetch_all(&sql, &params![])
            .await?
            .iter()
            .map(Submission::try_from)
            .collect()
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Submission>, DbError> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM testimonials WHERE uuid = ?");
        self.db
            .fetch_one(&sql, &params![uuid])
            .await?
            .as_ref()
            .map(Submission::try_from)
            .transpose()
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, uuid: &str) -> Result<bool, DbError> {
        let affected = self
            .db
            .execute("DELETE FROM testimonials WHERE uuid = ?", &params![uuid])
            .await?;
        Ok(affected > 0)
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let row = self
            .db
            .fetch_one("SELECT COUNT(*) AS count FROM testimonials", &params![])
            .await?;
        Ok(match row {
            Some(r) => r.get_i64("count")?.unwrap_or(0),
            None => 0,
        })
    }

    /// Media bytes by stored filename. `None` also covers legacy rows whose
    /// bytes have not been migrated yet.
    pub async fn media_by_filename(&self, file_name: &str) -> Result<Option<StoredFile>, DbError> {
        let row = self
            .db
            .fetch_one(
                "SELECT media_data, media_type FROM testimonials WHERE media_file = ?",
                &params![file_name],
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let Some(data) = row.get_bytes("media_data")? else {
            return Ok(None);
        };
        Ok(Some(StoredFile {
            data: data.to_vec(),
            mime_type: row
                .get_string("media_type")?
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            file_name: Some(file_name.to_string()),
        }))
    }
}
