use crate::api::error::AppError;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

/// CORS preflight: 204 with an empty body. The CORS headers themselves are
/// added to every response by the router.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Catch-all for unmatched routes and methods. `OPTIONS` is answered as a
/// preflight on any path.
pub async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return preflight().await.into_response();
    }
    AppError::NotFound.into_response()
}
