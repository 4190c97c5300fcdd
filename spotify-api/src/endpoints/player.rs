use super::Request;
use crate::macros::setter;
use crate::{SpotifyItemType, SpotifyUri};
use http::Method;
use serde::Serialize;
use std::borrow::Cow;

/// `PUT /me/player/play`
///
/// Tracks are sent as `uris`, albums, artists and playlists as `context_uri`.
#[derive(Debug, Clone, Serialize)]
pub struct StartPlayback {
    #[serde(skip_serializing_if = "Option::is_none")]
    context_uri: Option<SpotifyUri>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uris: Option<Vec<SpotifyUri>>,
    #[serde(skip)]
    device_id: Option<String>,
}

impl StartPlayback {
    pub fn new(uri: SpotifyUri) -> Self {
        let (context_uri, uris) = match uri.item_type() {
            SpotifyItemType::Track => (None, Some(vec![uri])),
            _ => (Some(uri), None),
        };

        Self {
            context_uri,
            uris,
            device_id: None,
        }
    }

    setter!(opt device_id: String);
}

impl Request for StartPlayback {
    type Response = ();

    fn method(&self) -> Method {
        Method::PUT
    }

    fn endpoint(&self) -> Cow<'_, str> {
        "/me/player/play".into()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        self.device_id
            .iter()
            .map(|device_id| ("device_id", device_id.clone()))
            .collect()
    }

    fn body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        serde_json::to_vec(self).map(Some)
    }
}
