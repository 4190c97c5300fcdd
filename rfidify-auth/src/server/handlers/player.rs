use axum::{extract::State, http::StatusCode, Json};
use spotify_api::{Request, SpotifyUri};

use crate::server::{error::ServerError, models::PlayRequest, AppState};

pub async fn start_playback(
    State(state): State<AppState>,
    Json(req): Json<PlayRequest>,
) -> Result<StatusCode, ServerError> {
    let uri = SpotifyUri::parse(req.uri).map_err(spotify_api::SpotifyApiError::from)?;

    state.web_api.send(Request::player().play(uri.clone())).await?;

    tracing::info!(uri = %uri, "Started playback");

    Ok(StatusCode::NO_CONTENT)
}
