use crate::services::error::BackendError;
use crate::services::staging::StagingError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to read staged file: {0}")]
    LocalIo(#[from] std::io::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Staging(StagingError::Malformed(_) | StagingError::NoFileProvided)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Staging(StagingError::Io(_))
            | AppError::Backend(_)
            | AppError::LocalIo(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!("Upload failed: {}", message),
            StatusCode::NOT_FOUND => {}
            _ => tracing::warn!("Rejected upload: {}", message),
        }

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
