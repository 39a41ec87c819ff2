#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use rust_upload_relay::config::RelayConfig;
use rust_upload_relay::services::error::BackendError;
use rust_upload_relay::services::media_hosting::{MediaHost, MediaUpload};
use rust_upload_relay::services::object_store::ObjectStore;
use rust_upload_relay::services::staging::StagingArea;
use rust_upload_relay::{AppState, create_app};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// In-memory object store keyed like the real one; a later upload to the
/// same key replaces the earlier object.
#[derive(Default)]
pub struct RecordingStore {
    pub objects: Mutex<HashMap<String, (Bytes, Option<String>)>>,
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn upload(
        &self,
        data: Bytes,
        key: &str,
        mime_type: Option<&str>,
    ) -> Result<String, BackendError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, mime_type.map(str::to_string)));
        Ok(format!("https://relay-bucket.s3.example.com/{}", key))
    }
}

#[derive(Default)]
pub struct RecordingMediaHost {
    pub uploads: Mutex<Vec<(String, Bytes, Option<String>)>>,
}

#[async_trait]
impl MediaHost for RecordingMediaHost {
    async fn upload(
        &self,
        data: Bytes,
        mime_type: Option<&str>,
        original_name: &str,
    ) -> Result<MediaUpload, BackendError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((
            original_name.to_string(),
            data,
            mime_type.map(str::to_string),
        ));
        Ok(MediaUpload {
            media_upload_id: format!("up_{}", uploads.len()),
            upload_url: "https://storage.example/direct".to_string(),
            external_id: Some("ext-1".to_string()),
        })
    }
}

pub struct TestApp {
    pub app: Router,
    pub staging_dir: TempDir,
}

impl TestApp {
    pub fn staged_files(&self) -> usize {
        count_files(self.staging_dir.path())
    }
}

pub async fn test_app(
    object_store: Arc<dyn ObjectStore>,
    media_host: Arc<dyn MediaHost>,
) -> TestApp {
    let _ = tracing_subscriber::fmt::try_init();
    let staging_dir = tempfile::tempdir().unwrap();
    let staging = StagingArea::create(staging_dir.path()).await.unwrap();

    let config = RelayConfig {
        upload_dir: staging_dir.path().to_path_buf(),
        ..RelayConfig::default()
    };

    let state = AppState::new(staging, object_store, media_host, config);
    TestApp {
        app: create_app(state),
        staging_dir,
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub fn multipart_body(parts: &[(&str, Option<&str>, Option<&str>, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, payload) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
            ),
        }
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(payload.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(filename: &str, content_type: &str, payload: &str) -> Request<Body> {
    multipart_request(&[("file", Some(filename), Some(content_type), payload)])
}

pub fn multipart_request(parts: &[(&str, Option<&str>, Option<&str>, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body)
        .unwrap_or_else(|_| panic!("not JSON: {:?}", String::from_utf8_lossy(&body)))
}

pub fn assert_relay_headers(response: &Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "OPTIONS, POST, GET");
    assert_eq!(headers["access-control-max-age"], "2592000");
}
