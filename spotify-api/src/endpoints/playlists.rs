use super::{PagedResponse, Request};
use crate::macros::setter;
use crate::SpotifyUri;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub uri: SpotifyUri,
    pub description: Option<String>,
    #[serde(default)]
    pub collaborative: bool,
    pub public: Option<bool>,
    pub owner: Option<PlaylistOwner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    pub display_name: Option<String>,
}

// Requests

/// `GET /me/playlists`
#[derive(Default, Debug, Clone, Serialize)]
pub struct ListPlaylists {
    offset: Option<u32>,
    limit: Option<u32>,
}

impl ListPlaylists {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(opt offset: u32);
    setter!(opt limit: u32);
}

impl Request for ListPlaylists {
    type Response = PagedResponse<Playlist>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/me/playlists".into()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}
