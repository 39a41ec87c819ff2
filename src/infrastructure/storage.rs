use crate::config::RelayConfig;
use crate::services::media_hosting::MuxMediaHost;
use crate::services::object_store::S3ObjectStore;
use anyhow::{Context, Result};
use aws_sdk_s3::config::{Credentials, Region, RequestChecksumCalculation};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared HTTP client for every outbound provider call; the timeout bounds
/// each request end to end.
pub fn setup_http_client(config: &RelayConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")
}

pub async fn setup_storage(
    config: &RelayConfig,
    http: reqwest::Client,
) -> Result<Arc<S3ObjectStore>> {
    let store = &config.object_store;

    info!(
        "☁️  S3 Storage: {} (Bucket: {}, Region: {})",
        store.endpoint.as_deref().unwrap_or("aws"),
        store.bucket,
        store.region
    );

    let mut loader = aws_config::from_env()
        .region(Region::new(store.region.clone()))
        .credentials_provider(Credentials::new(
            &store.access_key,
            &store.secret_key,
            None,
            None,
            "static",
        ));
    if let Some(endpoint) = &store.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    // Presigned PUTs must not carry SDK-computed checksums the client
    // cannot reproduce.
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(store.force_path_style)
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    let storage = S3ObjectStore::new(s3_client, http, store.clone())?;

    Ok(Arc::new(storage))
}

pub fn setup_media_host(config: &RelayConfig, http: reqwest::Client) -> Arc<MuxMediaHost> {
    info!("🎬 Media hosting: {}", config.media_hosting.api_base);
    Arc::new(MuxMediaHost::new(http, config.media_hosting.clone()))
}
