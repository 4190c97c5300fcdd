use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::uri::InvalidUri;

#[derive(Debug, Error)]
pub enum SpotifyApiError {
    #[error(transparent)]
    InvalidUri(#[from] InvalidUri),

    #[error("({status}) Spotify API error: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Not authenticated with Spotify")]
    Unauthenticated,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpotifyApiError {
    /// Status code of an upstream failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed Spotify error body, when the upstream sent one
    pub fn detail(&self) -> Option<ErrorDetail> {
        match self {
            Self::Upstream { body, .. } => serde_json::from_str::<ErrorResponse>(body)
                .ok()
                .map(|response| response.error),
            _ => None,
        }
    }
}

impl From<http::Error> for SpotifyApiError {
    fn from(value: http::Error) -> Self {
        Self::InvalidRequest(value.to_string())
    }
}

impl From<url::ParseError> for SpotifyApiError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidRequest(format!("Invalid URL: {}", value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub status: u16,
    pub message: String,
}
