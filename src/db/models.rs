use crate::db::value::DbRow;
use crate::error::DbError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Submission discriminator stored in `testimonials.testimonial_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Written,
    Photo,
    Video,
}

impl SubmissionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionKind::Written => "written",
            SubmissionKind::Photo => "photo",
            SubmissionKind::Video => "video",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "written" => Ok(SubmissionKind::Written),
            "photo" => Ok(SubmissionKind::Photo),
            "video" => Ok(SubmissionKind::Video),
            other => Err(DbError::Decode(format!("unknown testimonial_type `{other}`"))),
        }
    }
}

/// Optional free-text answers collected by every form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub current_flight_time: Option<String>,
    pub past_flight_time: Option<String>,
    pub use_case: Option<String>,
    pub weather_type: Option<String>,
    pub extreme_conditions: Option<String>,
    pub reason_for_flying: Option<String>,
}

/// Columns read for a [`Submission`]. Media bytes stay in the database; only
/// their presence is reported.
pub const SUBMISSION_COLUMNS: &str = "id, uuid, name, email, testimonial_text, media_file, \
    media_type, first_name, last_name, current_flight_time, past_flight_time, use_case, \
    weather_type, extreme_conditions, reason_for_flying, testimonial_type, created_at, \
    (media_data IS NOT NULL) AS has_media";

/// A row of `testimonials`, without the media bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub testimonial_text: Option<String>,
    pub media_file: Option<String>,
    pub media_type: Option<String>,
    /// False for legacy rows whose media still lives on disk.
    pub has_media: bool,
    #[serde(flatten)]
    pub questionnaire: Questionnaire,
    pub testimonial_type: SubmissionKind,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<&DbRow> for Submission {
    type Error = DbError;

    fn try_from(row: &DbRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row
                .get_i64("id")?
                .ok_or_else(|| DbError::Decode("testimonial without id".into()))?,
            uuid: row.require_string("uuid")?,
            name: row.require_string("name")?,
            email: row.require_string("email")?,
            testimonial_text: row.get_string("testimonial_text")?,
            media_file: row.get_string("media_file")?,
            media_type: row.get_string("media_type")?,
            has_media: row.get_i64("has_media")?.is_some_and(|v| v != 0),
            questionnaire: Questionnaire {
                first_name: row.get_string("first_name")?,
                last_name: row.get_string("last_name")?,
                current_flight_time: row.get_string("current_flight_time")?,
                past_flight_time: row.get_string("past_flight_time")?,
                use_case: row.get_string("use_case")?,
                weather_type: row.get_string("weather_type")?,
                extreme_conditions: row.get_string("extreme_conditions")?,
                reason_for_flying: row.get_string("reason_for_flying")?,
            },
            testimonial_type: row.require_string("testimonial_type")?.parse()?,
            created_at: row.get_timestamp("created_at")?,
        })
    }
}

pub const ASSET_COLUMNS: &str = "id, uuid, name, description, asset_type, file_name, mime_type, \
    file_size, created_at, updated_at";

/// Asset metadata; the file bytes are fetched separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub asset_type: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<&DbRow> for Asset {
    type Error = DbError;

    fn try_from(row: &DbRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row
                .get_i64("id")?
                .ok_or_else(|| DbError::Decode("asset without id".into()))?,
            uuid: row.require_string("uuid")?,
            name: row.require_string("name")?,
            description: row.get_string("description")?,
            asset_type: row.require_string("asset_type")?,
            file_name: row.require_string("file_name")?,
            mime_type: row.require_string("mime_type")?,
            file_size: row.get_i64("file_size")?,
            created_at: row.get_timestamp("created_at")?,
            updated_at: row.get_timestamp("updated_at")?,
        })
    }
}

/// Raw bytes plus the headers needed to serve them.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::value::{DbValue, NullType};

    fn row(pairs: Vec<(&str, DbValue)>) -> DbRow {
        let (cols, vals): (Vec<_>, Vec<_>) =
            pairs.into_iter().map(|(c, v)| (c.to_string(), v)).unzip();
        DbRow::new(cols, vals)
    }

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [SubmissionKind::Written, SubmissionKind::Photo, SubmissionKind::Video] {
            assert_eq!(kind.as_str().parse::<SubmissionKind>().unwrap(), kind);
        }
        assert!("audio".parse::<SubmissionKind>().is_err());
    }

    #[test]
    fn submission_from_sparse_row() {
        let r = row(vec![
            ("id", DbValue::Integer(7)),
            ("uuid", DbValue::Text("u-1".into())),
            ("name", DbValue::Text("Ada".into())),
            ("email", DbValue::Text("ada@example.com".into())),
            ("media_file", DbValue::Text("clip.mp4".into())),
            ("has_media", DbValue::Integer(0)),
            ("weather_type", DbValue::Text("fog".into())),
            ("testimonial_type", DbValue::Text("video".into())),
            ("created_at", DbValue::Text("2024-01-02 03:04:05".into())),
            ("testimonial_text", DbValue::Null(NullType::Text)),
        ]);
        let s = Submission::try_from(&r).unwrap();
        assert_eq!(s.id, 7);
        assert_eq!(s.testimonial_type, SubmissionKind::Video);
        assert_eq!(s.media_file.as_deref(), Some("clip.mp4"));
        assert!(!s.has_media);
        assert_eq!(s.questionnaire.weather_type.as_deref(), Some("fog"));
        assert!(s.testimonial_text.is_none());
        assert!(s.created_at.is_some());
    }

    #[test]
    fn postgres_boolean_has_media_is_accepted() {
        let r = row(vec![
            ("id", DbValue::Integer(1)),
            ("uuid", DbValue::Text("u".into())),
            ("name", DbValue::Text("n".into())),
            ("email", DbValue::Text("e".into())),
            ("has_media", DbValue::Boolean(true)),
            ("testimonial_type", DbValue::Text("photo".into())),
        ]);
        assert!(Submission::try_from(&r).unwrap().has_media);
    }
}
