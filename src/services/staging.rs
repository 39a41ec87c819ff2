use crate::utils::validation::staged_extension;
use axum::extract::Multipart;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Multipart field that carries the upload
pub const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("{0}")]
    Malformed(String),

    #[error("No file provided")]
    NoFileProvided,

    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written to the staging directory, owned by one request
#[derive(Debug)]
pub struct StagedUpload {
    pub local_path: PathBuf,
    pub original_name: String,
    pub declared_media_type: Option<String>,
    pub size_bytes: u64,
}

impl StagedUpload {
    /// Removes the staged file. Failures are logged, never returned.
    pub async fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.local_path).await {
            tracing::warn!(
                "Failed to remove staged file {}: {}",
                self.local_path.display(),
                e
            );
        }
    }
}

/// Local scratch directory for uploads in flight
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Creates the directory if it does not exist yet.
    pub async fn create(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Streams the `file` part of `multipart` to disk. Other fields, and a
    /// `file` field sent without a filename, are drained and ignored; only
    /// the first uploaded file is kept.
    pub async fn stage(&self, mut multipart: Multipart) -> Result<StagedUpload, StagingError> {
        let mut staged: Option<StagedUpload> = None;

        loop {
            let next = multipart.next_field().await;
            let mut field = match next {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    self.abandon(staged.as_ref()).await;
                    return Err(StagingError::Malformed(e.body_text()));
                }
            };

            // Parts without a filename are plain form values, even when named `file`.
            let is_upload = field.name() == Some(FILE_FIELD) && field.file_name().is_some();
            if staged.is_some() || !is_upload {
                // Skip without buffering.
                loop {
                    match field.chunk().await {
                        Ok(Some(_)) => continue,
                        Ok(None) => break,
                        Err(e) => {
                            self.abandon(staged.as_ref()).await;
                            return Err(StagingError::Malformed(e.body_text()));
                        }
                    }
                }
                continue;
            }

            let original_name = field.file_name().unwrap_or_default().to_string();
            let declared_media_type = field.content_type().map(|s| s.to_string());
            let local_path = self.dir.join(format!(
                "{}{}",
                Uuid::new_v4(),
                staged_extension(&original_name)
            ));

            let mut upload = StagedUpload {
                local_path,
                original_name,
                declared_media_type,
                size_bytes: 0,
            };

            if let Err(e) = write_field(&mut field, &mut upload).await {
                upload.discard().await;
                return Err(e);
            }

            tracing::debug!(
                "📝 Staged {} ({} bytes) at {}",
                upload.original_name,
                upload.size_bytes,
                upload.local_path.display()
            );
            staged = Some(upload);
        }

        staged.ok_or(StagingError::NoFileProvided)
    }

    async fn abandon(&self, staged: Option<&StagedUpload>) {
        if let Some(upload) = staged {
            upload.discard().await;
        }
    }
}

async fn write_field(
    field: &mut axum::extract::multipart::Field<'_>,
    upload: &mut StagedUpload,
) -> Result<(), StagingError> {
    let mut file = File::create(&upload.local_path).await?;

    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                file.write_all(&chunk).await?;
                upload.size_bytes += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(e) => return Err(StagingError::Malformed(e.body_text())),
        }
    }

    file.flush().await?;
    Ok(())
}
