//! Backend-neutral parameter and row types shared by both store variants.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::DbError;

/// SQL type a NULL parameter is bound as.
///
/// PostgreSQL types every bound parameter, so a NULL headed for a `BYTEA`
/// column has to be sent as a bytea NULL rather than a text NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullType {
    Text,
    Integer,
    Real,
    Blob,
    Boolean,
    Timestamp,
}

/// A single statement parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null(NullType),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl DbValue {
    pub const NULL: DbValue = DbValue::Null(NullType::Text);

    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null(_))
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => |$v:ident| $conv:expr, $null:expr;)*) => {
        $(
            impl From<$ty> for DbValue {
                fn from($v: $ty) -> Self {
                    $conv
                }
            }

            impl From<Option<$ty>> for DbValue {
                fn from(v: Option<$ty>) -> Self {
                    match v {
                        Some(v) => v.into(),
                        None => DbValue::Null($null),
                    }
                }
            }
        )*
    };
}

impl_from_value! {
    i32 => |v| DbValue::Integer(v as i64), NullType::Integer;
    i64 => |v| DbValue::Integer(v), NullType::Integer;
    usize => |v| DbValue::Integer(v as i64), NullType::Integer;
    f64 => |v| DbValue::Real(v), NullType::Real;
    bool => |v| DbValue::Boolean(v), NullType::Boolean;
    String => |v| DbValue::Text(v), NullType::Text;
    &str => |v| DbValue::Text(v.to_string()), NullType::Text;
    &String => |v| DbValue::Text(v.clone()), NullType::Text;
    Vec<u8> => |v| DbValue::Blob(v), NullType::Blob;
    &[u8] => |v| DbValue::Blob(v.to_vec()), NullType::Blob;
    DateTime<Utc> => |v| DbValue::Timestamp(v), NullType::Timestamp;
}

impl From<&Option<String>> for DbValue {
    fn from(v: &Option<String>) -> Self {
        v.as_deref().into()
    }
}

/// Build a parameter array for the query facade.
///
/// ```ignore
/// db.execute("DELETE FROM assets WHERE uuid = ?", &params![uuid]).await?;
/// ```
#[macro_export]
macro_rules! params {
    () => {{
        let empty: [$crate::db::DbValue; 0] = [];
        empty
    }};
    ($($p:expr),+ $(,)?) => {
        [$($crate::db::DbValue::from($p)),+]
    };
}

/// One result row: column names in select order with their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbRow {
    columns: Vec<String>,
    values: Vec<DbValue>,
}

impl DbRow {
    pub fn new(columns: Vec<String>, values: Vec<DbValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&DbValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|idx| &self.values[idx])
    }

    /// Missing columns and NULLs both read as `None`.
    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).is_none_or(DbValue::is_null)
    }

    pub fn get_i64(&self, column: &str) -> Result<Option<i64>, DbError> {
        match self.get(column) {
            None | Some(DbValue::Null(_)) => Ok(None),
            Some(DbValue::Integer(v)) => Ok(Some(*v)),
            Some(DbValue::Boolean(b)) => Ok(Some(*b as i64)),
            Some(DbValue::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| mismatch(column, "integer")),
            Some(_) => Err(mismatch(column, "integer")),
        }
    }

    pub fn get_str(&self, column: &str) -> Result<Option<&str>, DbError> {
        match self.get(column) {
            None | Some(DbValue::Null(_)) => Ok(None),
            Some(DbValue::Text(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(mismatch(column, "text")),
        }
    }

    pub fn get_string(&self, column: &str) -> Result<Option<String>, DbError> {
        Ok(self.get_str(column)?.map(str::to_owned))
    }

    /// Like [`DbRow::get_string`] but NULL is an error.
    pub fn require_string(&self, column: &str) -> Result<String, DbError> {
        self.get_string(column)?
            .ok_or_else(|| DbError::Decode(format!("column `{column}` is NULL")))
    }

    pub fn get_bytes(&self, column: &str) -> Result<Option<&[u8]>, DbError> {
        match self.get(column) {
            None | Some(DbValue::Null(_)) => Ok(None),
            Some(DbValue::Blob(b)) => Ok(Some(b.as_slice())),
            Some(DbValue::Text(s)) => Ok(Some(s.as_bytes())),
            Some(_) => Err(mismatch(column, "blob")),
        }
    }

    /// Reads a timestamp column.
    ///
    /// SQLite stores `CURRENT_TIMESTAMP` as `YYYY-MM-DD HH:MM:SS` text in UTC,
    /// PostgreSQL hands back a native timestamp.
    pub fn get_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, DbError> {
        match self.get(column) {
            None | Some(DbValue::Null(_)) => Ok(None),
            Some(DbValue::Timestamp(t)) => Ok(Some(*t)),
            Some(DbValue::Text(s)) => parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| mismatch(column, "timestamp")),
            Some(DbValue::Integer(secs)) => DateTime::from_timestamp(*secs, 0)
                .map(Some)
                .ok_or_else(|| mismatch(column, "timestamp")),
            Some(_) => Err(mismatch(column, "timestamp")),
        }
    }
}

fn mismatch(column: &str, expected: &str) -> DbError {
    DbError::Decode(format!("column `{column}` is not a {expected}"))
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn option_none_keeps_its_type() {
        assert_eq!(DbValue::from(None::<Vec<u8>>), DbValue::Null(NullType::Blob));
        assert_eq!(DbValue::from(None::<&str>), DbValue::Null(NullType::Text));
        assert_eq!(DbValue::from(Some(3_i64)), DbValue::Integer(3));
    }

    #[test]
    fn params_macro_converts_each_argument() {
        let p = params!["a", 2_i64, None::<String>];
        assert_eq!(p.len(), 3);
        assert_eq!(p[0], DbValue::Text("a".into()));
        assert!(p[2].is_null());
        assert!(params![].is_empty());
    }

    #[test]
    fn sqlite_timestamp_text_parses_as_utc() {
        let row = DbRow::new(
            vec!["created_at".into()],
            vec![DbValue::Text("2024-05-06 07:08:09".into())],
        );
        let t = row.get_timestamp("created_at").unwrap().unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2024, 5, 6));
        assert_eq!((t.hour(), t.minute(), t.second()), (7, 8, 9));
    }

    #[test]
    fn lookups_are_case_insensitive_and_null_aware() {
        let row = DbRow::new(
            vec!["Count".into(), "media_data".into()],
            vec![DbValue::Integer(4), DbValue::Null(NullType::Blob)],
        );
        assert_eq!(row.get_i64("count").unwrap(), Some(4));
        assert!(row.is_null("media_data"));
        assert!(row.is_null("missing"));
        assert_eq!(row.get_bytes("media_data").unwrap(), None);
        assert!(row.get_str("count").is_err());
        assert!(row.require_string("media_data").is_err());
    }
}
