use serde::Deserialize;
use thiserror::Error;

/// Error body returned by the Dify API on non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Error)]
pub enum DifyRequestError {
    /// Errors from the HTTP client
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    /// Required configuration is absent; no request was attempted
    #[error("missing configuration: {0}")]
    ConfigurationMissing(&'static str),

    /// The API rejected the request with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The backend emitted an explicit `error` event mid-stream
    #[error("stream error event: {message}")]
    ErrorEvent {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
}

/// Parse an error response body into an [`DifyRequestError::ApiError`].
///
/// Falls back to the raw body text when it is not the documented JSON shape.
pub(crate) fn parse_error_response(
    status: reqwest::StatusCode,
    bytes: &bytes::Bytes,
) -> DifyRequestError {
    if let Ok(body) = serde_json::from_slice::<ApiErrorBody>(bytes) {
        if let Some(message) = body.message {
            return DifyRequestError::ApiError {
                status: status.as_u16(),
                code: body.code,
                message,
            };
        }
    }

    DifyRequestError::ApiError {
        status: status.as_u16(),
        code: None,
        message: String::from_utf8_lossy(bytes).into_owned(),
    }
}
