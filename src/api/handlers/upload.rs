use crate::AppState;
use crate::api::error::AppError;
use crate::services::classifier::{Backend, classify};
use crate::services::media_hosting::MediaUpload;
use crate::services::staging::StagedUpload;
use crate::utils::validation::storage_key;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use bytes::Bytes;
use serde::Serialize;

/// Where the bytes ended up
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadOutcome {
    ObjectStore(StoredObject),
    MediaHosting(MediaUpload),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub storage_url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    pub size: u64,
    #[serde(flatten)]
    pub outcome: UploadOutcome,
}

/// `POST /upload`: stage the `file` field, pick a backend from its declared
/// media type, relay the bytes and report where they went.
///
/// The staged file is removed before responding, whether or not the upload
/// succeeded.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let staged = state.staging.stage(multipart).await?;
    tracing::info!(
        "📦 Received {} ({} bytes, {})",
        staged.original_name,
        staged.size_bytes,
        staged.declared_media_type.as_deref().unwrap_or("no media type")
    );

    let outcome = relay(&state, &staged).await;
    staged.discard().await;
    let outcome = outcome?;

    Ok(Json(UploadResponse {
        ok: true,
        filename: staged.original_name,
        mimetype: staged.declared_media_type,
        size: staged.size_bytes,
        outcome,
    }))
}

async fn relay(state: &AppState, staged: &StagedUpload) -> Result<UploadOutcome, AppError> {
    let mime_type = staged.declared_media_type.as_deref();
    let backend = classify(mime_type);
    tracing::debug!("Routing {} to {:?}", staged.original_name, backend);

    // The permit also bounds how many staged files are held in memory.
    let _permit = state
        .upload_permits
        .acquire()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let data = Bytes::from(tokio::fs::read(&staged.local_path).await?);

    match backend {
        Backend::ObjectStore => {
            let key = storage_key(&staged.original_name);
            let storage_url = state.object_store.upload(data, &key, mime_type).await?;
            Ok(UploadOutcome::ObjectStore(StoredObject { storage_url }))
        }
        Backend::MediaHosting => {
            let upload = state
                .media_host
                .upload(data, mime_type, &staged.original_name)
                .await?;
            Ok(UploadOutcome::MediaHosting(upload))
        }
    }
}
