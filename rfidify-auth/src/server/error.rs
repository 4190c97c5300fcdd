use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use spotify_api::SpotifyApiError;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::AuthError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{title}")]
    Validation {
        title: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn validation(errors: BTreeMap<String, Vec<String>>) -> Self {
        ServerError::Validation {
            title: "One or more validation errors occurred.".to_string(),
            errors,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Configuration(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = match self {
            ServerError::Validation { title, errors } => Json(json!({
                "title": title,
                "errors": errors,
            })),
            other => Json(json!({
                "error": other.to_string(),
            })),
        };

        (status, body).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::StateNotFound => ServerError::Unauthorized(err.to_string()),
            AuthError::Configuration(msg) => ServerError::Configuration(msg),
            AuthError::Spotify(err) => err.into(),
            AuthError::TokenStorage(_) | AuthError::Json(_) | AuthError::Io(_) => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

impl From<SpotifyApiError> for ServerError {
    fn from(err: SpotifyApiError) -> Self {
        match err {
            SpotifyApiError::InvalidUri(_) => ServerError::BadRequest(err.to_string()),
            SpotifyApiError::Unauthenticated
            | SpotifyApiError::TokenExchangeFailed(_)
            | SpotifyApiError::TokenRefreshFailed(_) => ServerError::Unauthorized(err.to_string()),
            SpotifyApiError::Upstream { .. } => {
                let message = err
                    .detail()
                    .map(|detail| detail.message)
                    .unwrap_or_else(|| err.to_string());
                ServerError::Upstream(message)
            }
            SpotifyApiError::Http(_) => ServerError::Upstream(err.to_string()),
            SpotifyApiError::InvalidRequest(_) | SpotifyApiError::Json(_) => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::from(AuthError::StateNotFound).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::from(SpotifyApiError::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::from(SpotifyApiError::TokenRefreshFailed("invalid_grant".into())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::from(SpotifyApiError::InvalidUri(spotify_api::InvalidUri(
                "nope".into()
            )))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(SpotifyApiError::Upstream {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_upstream_message_prefers_error_detail() {
        let error = ServerError::from(SpotifyApiError::Upstream {
            status: StatusCode::NOT_FOUND,
            body: r#"{"error":{"status":404,"message":"No active device found"}}"#.to_string(),
        });

        assert!(matches!(error, ServerError::Upstream(message) if message == "No active device found"));
    }
}
