use crate::config::ObjectStoreConfig;
use crate::services::error::{BackendError, failure_body};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::{PresignedRequest, PresigningConfig};
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use url::Url;

const PROVIDER: &str = "S3";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` under `key` and returns the object's public URL.
    async fn upload(
        &self,
        data: Bytes,
        key: &str,
        mime_type: Option<&str>,
    ) -> Result<String, BackendError>;
}

/// Uploads through presigned PUT URLs, so the object bytes never go through
/// the SDK's own transport.
pub struct S3ObjectStore {
    client: Client,
    http: reqwest::Client,
    endpoint: Url,
    config: ObjectStoreConfig,
}

impl S3ObjectStore {
    pub fn new(client: Client, http: reqwest::Client, config: ObjectStoreConfig) -> Result<Self> {
        let endpoint = resolve_endpoint(config.endpoint.as_deref(), &config.region)?;
        Ok(Self {
            client,
            http,
            endpoint,
            config,
        })
    }

    pub async fn presign_put(
        &self,
        key: &str,
        mime_type: Option<&str>,
    ) -> Result<PresignedRequest, BackendError> {
        let signing_error = |message: String| BackendError::Signing {
            provider: PROVIDER,
            message,
        };

        let presigning = PresigningConfig::expires_in(self.config.presign_expiry)
            .map_err(|e| signing_error(e.to_string()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(mime_type.unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref()));

        if self.config.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request
            .presigned(presigning)
            .await
            .map_err(|e| signing_error(e.to_string()))
    }

    pub fn public_url(&self, key: &str) -> String {
        public_object_url(
            &self.endpoint,
            &self.config.bucket,
            key,
            self.config.force_path_style,
        )
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        data: Bytes,
        key: &str,
        mime_type: Option<&str>,
    ) -> Result<String, BackendError> {
        let presigned = self.presign_put(key, mime_type).await?;
        let size = data.len();

        let mut request = self.http.put(presigned.uri());
        for (name, value) in presigned.headers() {
            request = request.header(name, value);
        }

        let response = request
            .body(data)
            .send()
            .await
            .map_err(BackendError::transport(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = failure_body(response).await;
            tracing::error!(
                bucket = %self.config.bucket,
                key = %key,
                status = status.as_u16(),
                "S3 presigned PUT rejected"
            );
            return Err(BackendError::Upload {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("☁️  Stored {} ({} bytes) in bucket {}", key, size, self.config.bucket);
        Ok(self.public_url(key))
    }
}

/// Explicit endpoint, or the AWS regional endpoint when none is configured.
pub fn resolve_endpoint(endpoint: Option<&str>, region: &str) -> Result<Url> {
    let raw = match endpoint {
        Some(endpoint) => endpoint.to_string(),
        None => format!("https://s3.{}.amazonaws.com", region),
    };
    Url::parse(&raw).with_context(|| format!("Invalid S3 endpoint '{}'", raw))
}

/// Public address of `key`; derived locally, never returned by the provider.
pub fn public_object_url(endpoint: &Url, bucket: &str, key: &str, path_style: bool) -> String {
    if path_style {
        let base = endpoint.as_str().trim_end_matches('/');
        return format!("{}/{}/{}", base, bucket, key);
    }

    let host = endpoint.host_str().unwrap_or_default();
    match endpoint.port() {
        Some(port) => format!("{}://{}.{}:{}/{}", endpoint.scheme(), bucket, host, port, key),
        None => format!("{}://{}.{}/{}", endpoint.scheme(), bucket, host, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
    use mockito::Matcher;
    use std::time::Duration;

    fn store_for(endpoint: &str, public_read: bool) -> S3ObjectStore {
        let config = ObjectStoreConfig {
            bucket: "relay-bucket".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some(endpoint.to_string()),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            force_path_style: true,
            public_read,
            presign_expiry: Duration::from_secs(600),
        };

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(endpoint)
            .credentials_provider(Credentials::new(
                &config.access_key,
                &config.secret_key,
                None,
                None,
                "static",
            ))
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        S3ObjectStore::new(
            Client::from_conf(s3_config),
            reqwest::Client::new(),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_public_url_virtual_hosted() {
        let endpoint = resolve_endpoint(Some("https://s3.us-east-2.wasabisys.com"), "us-east-2").unwrap();
        assert_eq!(
            public_object_url(&endpoint, "upward", "1700000000000_report_.txt", false),
            "https://upward.s3.us-east-2.wasabisys.com/1700000000000_report_.txt"
        );
    }

    #[test]
    fn test_public_url_defaults_to_aws_region() {
        let endpoint = resolve_endpoint(None, "eu-west-1").unwrap();
        assert_eq!(
            public_object_url(&endpoint, "media", "k.bin", false),
            "https://media.s3.eu-west-1.amazonaws.com/k.bin"
        );
    }

    #[test]
    fn test_public_url_path_style_keeps_port() {
        let endpoint = resolve_endpoint(Some("http://127.0.0.1:9000"), "us-east-1").unwrap();
        assert_eq!(
            public_object_url(&endpoint, "uploads", "1_a.txt", true),
            "http://127.0.0.1:9000/uploads/1_a.txt"
        );
        assert_eq!(
            public_object_url(&endpoint, "uploads", "1_a.txt", false),
            "http://uploads.127.0.0.1:9000/1_a.txt"
        );
    }

    #[test]
    fn test_public_url_is_deterministic() {
        let endpoint = resolve_endpoint(Some("https://s3.example.com"), "us-east-1").unwrap();
        let first = public_object_url(&endpoint, "b", "1_x.txt", false);
        let second = public_object_url(&endpoint, "b", "1_x.txt", false);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        assert!(resolve_endpoint(Some("not a url"), "us-east-1").is_err());
    }

    #[tokio::test]
    async fn test_presign_put_signs_content_type_and_expiry() {
        let store = store_for("http://127.0.0.1:9000", false);
        let presigned = store.presign_put("1_report_.txt", Some("text/plain")).await.unwrap();

        assert!(presigned.uri().starts_with("http://127.0.0.1:9000/relay-bucket/1_report_.txt?"));
        assert!(presigned.uri().contains("X-Amz-Expires=600"));
        assert!(
            presigned
                .headers()
                .any(|(name, value)| name.eq_ignore_ascii_case("content-type") && value == "text/plain")
        );
        assert!(!presigned.headers().any(|(name, _)| name.eq_ignore_ascii_case("x-amz-acl")));
    }

    #[tokio::test]
    async fn test_presign_put_with_public_read_acl() {
        let store = store_for("http://127.0.0.1:9000", true);
        let presigned = store.presign_put("1_a.bin", None).await.unwrap();

        let headers: Vec<(String, String)> = presigned
            .headers()
            .map(|(n, v)| (n.to_lowercase(), v.to_string()))
            .collect();
        assert!(headers.contains(&("x-amz-acl".to_string(), "public-read".to_string())));
        assert!(headers.contains(&(
            "content-type".to_string(),
            "application/octet-stream".to_string()
        )));
    }

    #[tokio::test]
    async fn test_upload_puts_bytes_and_returns_public_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", Matcher::Regex(r"^/relay-bucket/1_report_\.txt".to_string()))
            .match_header("content-type", "text/plain")
            .match_body("0123456789")
            .with_status(200)
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        let url = store
            .upload(Bytes::from_static(b"0123456789"), "1_report_.txt", Some("text/plain"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(url, format!("{}/relay-bucket/1_report_.txt", server.url()));
    }

    #[tokio::test]
    async fn test_upload_failure_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", Matcher::Any)
            .with_status(403)
            .with_body("<Error><Code>AccessDenied</Code></Error>")
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        let err = store
            .upload(Bytes::from_static(b"data"), "1_a.txt", Some("text/plain"))
            .await
            .unwrap_err();

        match &err {
            BackendError::Upload { status, body, .. } => {
                assert_eq!(*status, 403);
                assert!(body.contains("AccessDenied"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().starts_with("S3 PUT failed: 403"));
    }
}
