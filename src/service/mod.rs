pub mod assets;
pub mod media_migration;
pub mod pg_migration;
pub mod submissions;

pub use assets::{AssetStore, AssetUpdate, NewAsset};
pub use media_migration::{MediaMigrationReport, migrate_legacy_media};
pub use pg_migration::{CopyReport, copy_submissions};
pub use submissions::{MediaUpload, NewSubmission, SubmissionStore};
