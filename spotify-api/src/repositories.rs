use crate::endpoints::{player::StartPlayback, playlists::ListPlaylists};
use crate::SpotifyUri;

pub struct PlaylistRepository;

impl PlaylistRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListPlaylists {
        ListPlaylists::default()
    }
}

pub struct PlayerRepository;

impl PlayerRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn play(&self, uri: SpotifyUri) -> StartPlayback {
        StartPlayback::new(uri)
    }
}
