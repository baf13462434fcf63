use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("resource not found")]
    NotFound,

    #[error("validation rejected: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unexpected status {0}")]
    Status(u16),
}

impl ApiError {
    /// Failures the poll layer swallows; the next scheduled cycle retries.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status(code) => *code >= 500,
            _ => false,
        }
    }

    /// Map a non-success HTTP status and its body into the taxonomy.
    pub(crate) fn from_status(code: u16, body: String) -> ApiError {
        match code {
            404 => ApiError::NotFound,
            400 | 422 => ApiError::Validation(error_detail(body)),
            409 => ApiError::Conflict(error_detail(body)),
            other => ApiError::Status(other),
        }
    }
}

/// Servers wrap human-readable rejections as `{"detail": "..."}`; fall back
/// to the raw body when they do not.
fn error_detail(body: String) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.detail,
        Err(_) => body,
    }
}
