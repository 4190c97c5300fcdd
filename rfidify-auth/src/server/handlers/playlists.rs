use axum::{
    extract::{Query, State},
    Json,
};
use spotify_api::{endpoints::PagedResponse, endpoints::playlists::Playlist, Request};

use crate::server::{error::ServerError, models::PlaylistsParams, AppState};

pub async fn list_playlists(
    State(state): State<AppState>,
    Query(params): Query<PlaylistsParams>,
) -> Result<Json<PagedResponse<Playlist>>, ServerError> {
    let mut request = Request::playlists().list();
    if let Some(offset) = params.offset {
        request = request.offset(offset);
    }

    let page = state.web_api.send(request).await?;

    tracing::debug!(
        count = page.items.len(),
        offset = page.offset,
        total = page.total,
        "Listed playlists"
    );

    Ok(Json(page))
}
