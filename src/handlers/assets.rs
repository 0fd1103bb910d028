use crate::db::Asset;
use crate::handlers::UploadForm;
use crate::service::{AssetUpdate, NewAsset};
use crate::{VaultError, router::VaultState};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    pub asset: Asset,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: &'static str,
}

/// POST /api/assets/upload: file part `asset` plus `name`, `description`
/// and `asset_type`.
pub async fn upload_asset(
    State(state): State<VaultState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, VaultError> {
    let form = UploadForm::read(multipart, "asset").await?;
    let Some(file) = form.file.as_ref() else {
        return Err(VaultError::BadRequest("No file uploaded".to_string()));
    };

    let asset = state
        .assets
        .insert(NewAsset {
            name: form.require("name")?,
            description: form.text("description"),
            asset_type: form.require("asset_type")?,
            file_name: file.file_name.clone(),
            mime_type: file.content_type.clone(),
            data: file.data.to_vec(),
        })
        .await?;
    Ok(Json(UploadResponse {
        success: true,
        message: "Asset uploaded successfully!",
        asset,
    }))
}

/// GET /api/assets
pub async fn list_assets(State(state): State<VaultState>) -> Result<Json<Vec<Asset>>, VaultError> {
    Ok(Json(state.assets.list().await?))
}

/// GET /api/assets/{uuid}
pub async fn get_asset(
    State(state): State<VaultState>,
    Path(uuid): Path<String>,
) -> Result<Json<Asset>, VaultError> {
    state
        .assets
        .get(&uuid)
        .await?
        .map(Json)
        .ok_or(VaultError::NotFound("Asset"))
}

/// PUT /api/assets/{uuid}
pub async fn update_asset(
    State(state): State<VaultState>,
    Path(uuid): Path<String>,
    Json(update): Json<AssetUpdate>,
) -> Result<Json<AckResponse>, VaultError> {
    if !state.assets.update(&uuid, update).await? {
        return Err(VaultError::NotFound("Asset"));
    }
    Ok(Json(AckResponse {
        success: true,
        message: "Asset updated successfully",
    }))
}

/// DELETE /api/assets/{uuid}
pub async fn delete_asset(
    State(state): State<VaultState>,
    Path(uuid): Path<String>,
) -> Result<Json<AckResponse>, VaultError> {
    if !state.assets.delete(&uuid).await? {
        return Err(VaultError::NotFound("Asset"));
    }
    Ok(Json(AckResponse {
        success: true,
        message: "Asset deleted successfully",
    }))
}

/// GET /assets/{uuid}: the stored bytes, served inline.
pub async fn serve_asset(
    State(state): State<VaultState>,
    Path(uuid): Path<String>,
) -> Result<Response, VaultError> {
    let file = state
        .assets
        .file(&uuid)
        .await?
        .ok_or(VaultError::NotFound("Asset"))?;
    let disposition = match file.file_name.as_deref() {
        Some(name) => format!("inline; filename=\"{}\"", name.replace('"', "")),
        None => "inline".to_string(),
    };
    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type),
            (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data,
    )
        .into_response())
}
