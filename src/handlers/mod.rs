pub mod assets;
pub mod health;
pub mod testimonials;

use crate::VaultError;
use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;

/// Upload cap for every multipart route.
pub const MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// The single file part of a multipart form.
#[derive(Debug)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// A multipart form split into its text fields and at most one file.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<FilePart>,
}

impl UploadForm {
    /// Drain `multipart`, keeping the part named `file_field` as the file
    /// and every other named part as text.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, VaultError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if name == file_field {
                if form.file.is_some() {
                    return Err(VaultError::BadRequest(format!(
                        "only one `{file_field}` file is accepted"
                    )));
                }
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await?;
                form.file = Some(FilePart {
                    file_name,
                    content_type,
                    data,
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// A text field, with blank values treated as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    pub fn require(&self, name: &str) -> Result<String, VaultError> {
        self.text(name)
            .ok_or_else(|| VaultError::BadRequest(format!("missing field `{name}`")))
    }
}
