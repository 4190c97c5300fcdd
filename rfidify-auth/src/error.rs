use spotify_api::SpotifyApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization state not found or already used")]
    StateNotFound,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token storage error: {0}")]
    TokenStorage(String),

    #[error(transparent)]
    Spotify(#[from] SpotifyApiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
