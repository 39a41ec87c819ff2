use thiserror::Error;

/// Failures talking to an upload provider. Every message names the provider
/// and, for HTTP failures, carries the status code and response body.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{provider} create failed: {status}: {body}")]
    Create {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} PUT failed: {status} - {body}")]
    Upload {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} could not sign upload: {message}")]
    Signing {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} response is missing `{field}`")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl BackendError {
    /// The request URL is stripped from the source: presigned URLs carry
    /// credentials and a live signature.
    pub(crate) fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport {
            provider,
            source: source.without_url(),
        }
    }
}

/// Reads the body of a failed provider response for error reporting.
pub(crate) async fn failure_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
