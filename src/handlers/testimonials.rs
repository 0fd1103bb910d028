use crate::db::{Questionnaire, Submission, SubmissionKind};
use crate::handlers::{FilePart, UploadForm};
use crate::service::{MediaUpload, NewSubmission};
use crate::{VaultError, router::VaultState};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WrittenForm {
    pub name: String,
    pub email: String,
    pub testimonial: Option<String>,
    #[serde(flatten)]
    pub questionnaire: Questionnaire,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: &'static str,
    pub uuid: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

/// POST /submit-written-testimonial
pub async fn submit_written(
    State(state): State<VaultState>,
    Json(form): Json<WrittenForm>,
) -> Result<Json<SubmitResponse>, VaultError> {
    let uuid = state
        .submissions
        .insert(NewSubmission {
            name: form.name,
            email: form.email,
            testimonial_text: form.testimonial,
            questionnaire: form.questionnaire,
            kind: SubmissionKind::Written,
            media: None,
        })
        .await?;
    Ok(Json(SubmitResponse {
        success: true,
        message: "Written testimonial submitted successfully!",
        uuid,
    }))
}

/// POST /submit-photo-testimonial, file part `photo`.
pub async fn submit_photo(
    State(state): State<VaultState>,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>, VaultError> {
    let form = UploadForm::read(multipart, "photo").await?;
    let uuid = store_media_submission(&state, form, SubmissionKind::Photo).await?;
    Ok(Json(SubmitResponse {
        success: true,
        message: "Photo testimonial submitted successfully!",
        uuid,
    }))
}

/// POST /submit-video-testimonial, file part `video`.
pub async fn submit_video(
    State(state): State<VaultState>,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>, VaultError> {
    let form = UploadForm::read(multipart, "video").await?;
    let uuid = store_media_submission(&state, form, SubmissionKind::Video).await?;
    Ok(Json(SubmitResponse {
        success: true,
        message: "Video testimonial submitted successfully!",
        uuid,
    }))
}

async fn store_media_submission(
    state: &VaultState,
    form: UploadForm,
    kind: SubmissionKind,
) -> Result<String, VaultError> {
    let media = form.file.as_ref().map(media_upload).transpose()?;
    info!(
        kind = %kind,
        file = media.as_ref().map(|m| m.file_name.as_str()).unwrap_or("<none>"),
        "media testimonial received"
    );

    let questionnaire = Questionnaire {
        first_name: form.text("first_name"),
        last_name: form.text("last_name"),
        current_flight_time: form.text("current_flight_time"),
        past_flight_time: form.text("past_flight_time"),
        use_case: form.text("use_case"),
        weather_type: form.text("weather_type"),
        extreme_conditions: form.text("extreme_conditions"),
        reason_for_flying: form.text("reason_for_flying"),
    };
    let uuid = state
        .submissions
        .insert(NewSubmission {
            name: form.require("name")?,
            email: form.require("email")?,
            testimonial_text: form.text("testimonial"),
            questionnaire,
            kind,
            media,
        })
        .await?;
    Ok(uuid)
}

/// Validate the MIME type and give the upload a unique stored name that
/// keeps the original extension.
fn media_upload(file: &FilePart) -> Result<MediaUpload, VaultError> {
    let ct = file.content_type.as_str();
    if !(ct.starts_with("image/") || ct.starts_with("video/")) {
        return Err(VaultError::BadRequest(
            "Only video and image files are allowed!".to_string(),
        ));
    }
    Ok(MediaUpload {
        file_name: stored_file_name(&file.file_name),
        mime_type: file.content_type.clone(),
        data: file.data.to_vec(),
    })
}

fn stored_file_name(original: &str) -> String {
    let ext = std::path::Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{}-{}{}", Utc::now().timestamp_millis(), Uuid::new_v4(), ext)
}

/// GET /api/testimonials
pub async fn list_testimonials(
    State(state): State<VaultState>,
) -> Result<Json<Vec<Submission>>, VaultError> {
    Ok(Json(state.submissions.list().await?))
}

/// GET /api/testimonial/{uuid}
pub async fn get_testimonial(
    State(state): State<VaultState>,
    Path(uuid): Path<String>,
) -> Result<Json<Submission>, VaultError> {
    state
        .submissions
        .get(&uuid)
        .await?
        .map(Json)
        .ok_or(VaultError::NotFound("Testimonial"))
}

/// DELETE /api/testimonial/{uuid}
pub async fn delete_testimonial(
    State(state): State<VaultState>,
    Path(uuid): Path<String>,
) -> Result<Json<DeleteResponse>, VaultError> {
    if !state.submissions.delete(&uuid).await? {
        return Err(VaultError::NotFound("Testimonial"));
    }
    info!(uuid = %uuid, "testimonial deleted");
    Ok(Json(DeleteResponse {
        success: true,
        message: "Testimonial deleted successfully",
    }))
}

/// GET /uploads/{filename}
pub async fn serve_upload(
    State(state): State<VaultState>,
    Path(filename): Path<String>,
) -> Result<Response, VaultError> {
    let file = state
        .submissions
        .media_by_filename(&filename)
        .await?
        .ok_or(VaultError::NotFound("File"))?;
    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type),
            (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
        ],
        file.data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_keeps_extension() {
        let name = stored_file_name("clip.final.MOV");
        assert!(name.ends_with(".MOV"));
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert!(Uuid::parse_str(rest.trim_end_matches(".MOV")).is_ok());

        assert!(!stored_file_name("noext").contains('.'));
    }

    #[test]
    fn rejects_non_media_types() {
        let part = FilePart {
            file_name: "notes.txt".into(),
            content_type: "text/plain".into(),
            data: Default::default(),
        };
        assert!(matches!(media_upload(&part), Err(VaultError::BadRequest(_))));

        let part = FilePart {
            content_type: "image/heic".into(),
            ..part
        };
        assert_eq!(media_upload(&part).unwrap().mime_type, "image/heic");
    }
}
