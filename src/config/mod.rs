use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Object store (S3-compatible) settings
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Bucket receiving generic uploads
    pub bucket: String,

    /// Signing region (default: "us-east-1")
    pub region: String,

    /// S3-compatible endpoint; AWS regional endpoint when unset
    pub endpoint: Option<String>,

    pub access_key: String,
    pub secret_key: String,

    /// Use `<endpoint>/<bucket>/<key>` addressing (default: false)
    pub force_path_style: bool,

    /// Sign uploads with the `public-read` canned ACL (default: false)
    pub public_read: bool,

    /// Lifetime of presigned PUT URLs (default: 10 minutes)
    pub presign_expiry: Duration,
}

/// Media hosting (Mux) settings
#[derive(Debug, Clone)]
pub struct MediaHostingConfig {
    /// API base URL (default: "https://api.mux.com")
    pub api_base: String,
    pub token_id: String,
    pub token_secret: String,
}

/// Process-wide relay configuration, read once at startup
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen port (default: 3020)
    pub port: u16,

    /// Local staging directory for incoming files (default: "./uploads")
    pub upload_dir: PathBuf,

    /// Maximum accepted file size in bytes (default: 1 GB)
    pub max_file_size: usize,

    /// Concurrent outbound uploads across all requests (default: 64)
    pub max_concurrent_uploads: usize,

    /// Deadline for every outbound provider request (default: 60s)
    pub upstream_timeout: Duration,

    pub object_store: ObjectStoreConfig,
    pub media_hosting: MediaHostingConfig,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: String::new(),
            secret_key: String::new(),
            force_path_style: false,
            public_read: false,
            presign_expiry: Duration::from_secs(600),
        }
    }
}

impl Default for MediaHostingConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.mux.com".to_string(),
            token_id: String::new(),
            token_secret: String::new(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 3020,
            upload_dir: PathBuf::from("./uploads"),
            max_file_size: 1024 * 1024 * 1024, // 1 GB
            max_concurrent_uploads: 64,
            upstream_timeout: Duration::from_secs(60),
            object_store: ObjectStoreConfig::default(),
            media_hosting: MediaHostingConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Provider credentials and the bucket are required; everything else
    /// falls back to [`RelayConfig::default`].
    pub fn from_env() -> Result<Self> {
        let default = Self::default();

        Ok(Self {
            port: parsed("PORT").unwrap_or(default.port),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_file_size: parsed("MAX_FILE_SIZE").unwrap_or(default.max_file_size),

            max_concurrent_uploads: parsed("MAX_CONCURRENT_UPLOADS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default.max_concurrent_uploads),

            upstream_timeout: parsed("UPSTREAM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.upstream_timeout),

            object_store: ObjectStoreConfig {
                bucket: required("S3_BUCKET")?,
                region: env::var("S3_REGION").unwrap_or(default.object_store.region),
                endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.trim().is_empty()),
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
                force_path_style: flag("S3_FORCE_PATH_STYLE")
                    .unwrap_or(default.object_store.force_path_style),
                public_read: flag("S3_PUBLIC_READ").unwrap_or(default.object_store.public_read),
                presign_expiry: parsed("S3_PRESIGN_EXPIRY_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(default.object_store.presign_expiry),
            },

            media_hosting: MediaHostingConfig {
                api_base: env::var("MUX_API_URL").unwrap_or(default.media_hosting.api_base),
                token_id: required("MUX_TOKEN_ID")?,
                token_secret: required("MUX_TOKEN_SECRET")?,
            },
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} must be set", name))
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v.to_lowercase() == "true" || v == "1")
}
