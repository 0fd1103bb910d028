use crate::db::models::{ASSET_COLUMNS, Asset, StoredFile};
use crate::db::Database;
use crate::error::DbError;
use crate::params;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub name: String,
    pub description: Option<String>,
    pub asset_type: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Editable metadata; the file itself is immutable once uploaded.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetUpdate {
    pub name: String,
    pub description: Option<String>,
    pub asset_type: String,
}

/// Typed access to the `assets` table through the query facade.
#[derive(Clone, Debug)]
pub struct AssetStore {
    db: Database,
}

impl AssetStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, new: NewAsset) -> Result<Asset, DbError> {
        let uuid = Uuid::new_v4().to_string();
        let file_size = new.data.len();

        let stmt = self
            .db
            .prepare(
                r#"INSERT INTO assets (
                    uuid, name, description, asset_type, file_name, mime_type, file_data, file_size
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .await?;
        stmt.run(&params![
            uuid.as_str(),
            new.name,
            new.description,
            new.asset_type,
            new.file_name,
            new.mime_type,
            new.data,
            file_size,
        ])
        .await?;
        info!(uuid = %uuid, file_size, "asset stored");

        self.get(&uuid)
            .await?
            .ok_or_else(|| DbError::Decode(format!("asset {uuid} vanished after insert")))
    }

    /// All assets, newest first.
    pub async fn list(&self) -> Result<Vec<Asset>, DbError> {
        let sql = format!("SELECT {ASSET_COLUMNS} FROM assets ORDER BY created_at DESC, id DESC");
        self.db
            .fetch_all(&sql, &params![])
            .await?
            .iter()
            .map(Asset::try_from)
            .collect()
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Asset>, DbError> {
        let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE uuid = ?");
        self.db
            .fetch_one(&sql, &params![uuid])
            .await?
            .as_ref()
            .map(Asset::try_from)
            .transpose()
    }

    pub async fn file(&self, uuid: &str) -> Result<Option<StoredFile>, DbError> {
        let row = self
            .db
            .fetch_one(
                "SELECT file_data, mime_type, file_name FROM assets WHERE uuid = ?",
                &params![uuid],
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let Some(data) = row.get_bytes("file_data")? else {
            return Ok(None);
        };
        Ok(Some(StoredFile {
            data: data.to_vec(),
            mime_type: row.require_string("mime_type")?,
            file_name: row.get_string("file_name")?,
        }))
    }

    /// Returns whether a row was updated. `updated_at` is bound rather than
    /// left to `CURRENT_TIMESTAMP`, which SQLite only keeps to the second.
    pub async fn update(&self, uuid: &str, update: AssetUpdate) -> Result<bool, DbError> {
        let affected = self
            .db
            .execute(
                "UPDATE assets SET name = ?, description = ?, asset_type = ?, \
                 updated_at = ? WHERE uuid = ?",
                &params![
                    update.name,
                    update.description,
                    update.asset_type,
                    Utc::now(),
                    uuid
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, DbError> {
        let affected = self
            .db
            .execute("DELETE FROM assets WHERE uuid = ?", &params![uuid])
            .await?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbSettings;
    use chrono::SubsecRound;
    use tempfile::tempdir;

    fn logo() -> NewAsset {
        NewAsset {
            name: "Logo".into(),
            description: None,
            asset_type: "logo".into(),
            file_name: "logo.png".into(),
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn crud_cycle() {
        let dir = tempdir().unwrap();
        let db = Database::connect(DbSettings::embedded(dir.path())).await.unwrap();
        let store = AssetStore::new(db);

        let before = Utc::now().trunc_subsecs(3);
        let asset = store.insert(logo()).await.unwrap();
        assert_eq!(asset.file_size, Some(3));
        // SQLite stores server timestamps to the millisecond.
        assert!(asset.created_at.unwrap() >= before);

        let file = store.file(&asset.uuid).await.unwrap().unwrap();
        assert_eq!(file.data, [1, 2, 3]);
        assert_eq!(file.file_name.as_deref(), Some("logo.png"));

        let updated = store
            .update(
                &asset.uuid,
                AssetUpdate {
                    name: "Logo v2".into(),
                    description: Some("dark".into()),
                    asset_type: "logo".into(),
                },
            )
            .await
            .unwrap();
        assert!(updated);
        let got = store.get(&asset.uuid).await.unwrap().unwrap();
        assert_eq!(got.name, "Logo v2");
        assert_eq!(got.description.as_deref(), Some("dark"));
        assert!(got.updated_at.unwrap() >= asset.updated_at.unwrap());
        assert!(got.updated_at.unwrap() >= before);

        assert_eq!(store.list().await.unwrap().len(), 1);
        assert!(store.delete(&asset.uuid).await.unwrap());
        assert!(store.file(&asset.uuid).await.unwrap().is_none());
        assert!(!store
            .update(
                &asset.uuid,
                AssetUpdate {
                    name: "x".into(),
                    description: None,
                    asset_type: "x".into(),
                },
            )
            .await
            .unwrap());
    }
}
