mod callback;
mod initiate;
mod player;
mod playlists;

pub use callback::{authorization_callback, complete_authorization};
pub use initiate::initiate_authorization;
pub use player::start_playback;
pub use playlists::list_playlists;

use crate::server::models::HealthResponse;
use axum::Json;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
