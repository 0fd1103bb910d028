//! Process configuration, layered with figment:
//! defaults → `VAULT_*` variables → the bare platform variables
//! (`DATABASE_URL`, `PORT`, `RAILWAY_VOLUME_MOUNT_PATH`).

use crate::db::DbSettings;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// PostgreSQL connection string. Absent or blank selects SQLite.
    pub database_url: Option<String>,
    /// Root for `data/` and the legacy `uploads/` directory.
    pub storage_root: Option<PathBuf>,
    pub port: u16,
    pub loglevel: String,
    pub busy_timeout_secs: u64,
    pub pg_connect_timeout_secs: u64,
    pub pg_max_connections: u32,
    /// Delete legacy upload files once their bytes are in the database.
    pub remove_migrated_files: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            storage_root: None,
            port: 3000,
            loglevel: "info".to_string(),
            busy_timeout_secs: 30,
            pg_connect_timeout_secs: 5,
            pg_max_connections: 10,
            remove_migrated_files: true,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("VAULT_"))
            .merge(Env::raw().only(&["DATABASE_URL", "PORT"]))
            .merge(
                Env::raw()
                    .only(&["RAILWAY_VOLUME_MOUNT_PATH"])
                    .map(|_| "storage_root".into()),
            )
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    pub fn storage_root(&self) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage_root().join("data")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.storage_root().join("uploads")
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn db_settings(&self) -> DbSettings {
        DbSettings {
            database_url: self.database_url().map(str::to_owned),
            data_dir: self.data_dir(),
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
            pg_connect_timeout: Duration::from_secs(self.pg_connect_timeout_secs),
            pg_max_connections: self.pg_max_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_use_working_directory() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let cfg = Config::load()?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.data_dir(), PathBuf::from("./data"));
            assert_eq!(cfg.uploads_dir(), PathBuf::from("./uploads"));
            assert!(cfg.db_settings().database_url.is_none());
            Ok(())
        });
    }

    #[test]
    fn platform_variables_are_recognised() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://u:p@db/app");
            jail.set_env("PORT", "8080");
            jail.set_env("RAILWAY_VOLUME_MOUNT_PATH", "/app");
            let cfg = Config::load()?;
            assert_eq!(cfg.database_url(), Some("postgres://u:p@db/app"));
            assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
            assert_eq!(cfg.data_dir(), PathBuf::from("/app/data"));
            assert_eq!(
                cfg.db_settings().sqlite_path(),
                PathBuf::from("/app/data/testimonials.db")
            );
            Ok(())
        });
    }

    #[test]
    fn blank_database_url_is_absent() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", " ");
            let cfg = Config::load()?;
            assert_eq!(cfg.database_url(), None);
            Ok(())
        });
    }

    #[test]
    fn prefixed_overrides() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("VAULT_BUSY_TIMEOUT_SECS", "45");
            jail.set_env("VAULT_REMOVE_MIGRATED_FILES", "false");
            let cfg = Config::load()?;
            assert_eq!(cfg.db_settings().busy_timeout, Duration::from_secs(45));
            assert!(!cfg.remove_migrated_files);
            Ok(())
        });
    }
}
