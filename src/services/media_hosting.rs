use crate::config::MediaHostingConfig;
use crate::services::error::{BackendError, failure_body};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

const PROVIDER: &str = "Mux";

/// Identifiers returned to the caller after a media upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUpload {
    pub media_upload_id: String,
    pub upload_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(
        &self,
        data: Bytes,
        mime_type: Option<&str>,
        original_name: &str,
    ) -> Result<MediaUpload, BackendError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct DirectUpload {
    id: Option<String>,
    url: Option<String>,
}

/// Mux direct uploads: create an upload slot, then PUT the bytes to the
/// single-use URL it returns.
pub struct MuxMediaHost {
    http: reqwest::Client,
    config: MediaHostingConfig,
}

impl MuxMediaHost {
    pub fn new(http: reqwest::Client, config: MediaHostingConfig) -> Self {
        Self { http, config }
    }

    fn uploads_endpoint(&self) -> String {
        format!(
            "{}/video/v1/uploads",
            self.config.api_base.trim_end_matches('/')
        )
    }

    async fn create_upload(
        &self,
        external_id: &str,
        original_name: &str,
    ) -> Result<(String, String), BackendError> {
        let request_body = json!({
            "cors_origin": "*",
            "new_asset_settings": {
                "playback_policy": ["public"],
                "passthrough": external_id,
                "meta": {
                    "title": original_name,
                    "external_id": external_id,
                },
            },
        });

        let response = self
            .http
            .post(self.uploads_endpoint())
            .header(
                header::AUTHORIZATION,
                basic_auth(&self.config.token_id, &self.config.token_secret),
            )
            .header(header::ACCEPT, "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(BackendError::transport(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = failure_body(response).await;
            tracing::error!(status = status.as_u16(), "Mux upload creation rejected");
            return Err(BackendError::Create {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(BackendError::transport(PROVIDER))?;
        parse_direct_upload(&text)
    }
}

#[async_trait]
impl MediaHost for MuxMediaHost {
    async fn upload(
        &self,
        data: Bytes,
        mime_type: Option<&str>,
        original_name: &str,
    ) -> Result<MediaUpload, BackendError> {
        let external_id = Uuid::new_v4().to_string();
        let (upload_id, upload_url) = self.create_upload(&external_id, original_name).await?;
        tracing::debug!(upload_id = %upload_id, "Mux direct upload created");

        let size = data.len();
        let response = self
            .http
            .put(&upload_url)
            .header(
                header::CONTENT_TYPE,
                mime_type.unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref()),
            )
            .body(data)
            .send()
            .await
            .map_err(BackendError::transport(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = failure_body(response).await;
            tracing::error!(upload_id = %upload_id, status = status.as_u16(), "Mux PUT rejected");
            return Err(BackendError::Upload {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("🎬 Sent {} ({} bytes) to Mux upload {}", original_name, size, upload_id);

        Ok(MediaUpload {
            media_upload_id: upload_id,
            upload_url,
            external_id: Some(external_id),
        })
    }
}

/// `Authorization` value for the Mux token pair.
pub fn basic_auth(token_id: &str, token_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", token_id, token_secret))
    )
}

fn parse_direct_upload(text: &str) -> Result<(String, String), BackendError> {
    let envelope: Envelope<DirectUpload> =
        serde_json::from_str(text).map_err(|e| BackendError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

    let missing = |field| BackendError::MissingField {
        provider: PROVIDER,
        field,
    };

    let upload = envelope.data.ok_or_else(|| missing("data"))?;
    let id = upload
        .id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing("data.id"))?;
    let url = upload
        .url
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing("data.url"))?;

    Ok((id, url))
}
