use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid Spotify URI: {0}")]
pub struct InvalidUri(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotifyItemType {
    Album,
    Artist,
    Playlist,
    Track,
}

impl SpotifyItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
            Self::Track => "track",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "album" => Some(Self::Album),
            "artist" => Some(Self::Artist),
            "playlist" => Some(Self::Playlist),
            "track" => Some(Self::Track),
            _ => None,
        }
    }
}

impl Display for SpotifyItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `spotify:<type>:<id>` resource identifier.
///
/// The id must be one or more ASCII alphanumeric characters and nothing may
/// follow it, so `spotify:track:abc:def` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpotifyUri {
    raw: String,
    id: String,
    item_type: SpotifyItemType,
}

impl SpotifyUri {
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidUri> {
        let raw = raw.into();
        let Some((item_type, id)) = split(&raw) else {
            return Err(InvalidUri(raw));
        };
        let id = id.to_string();

        Ok(Self { raw, id, item_type })
    }

    /// Same matching rules as [`SpotifyUri::parse`] without building the value.
    pub fn is_valid(raw: &str) -> bool {
        split(raw).is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn item_type(&self) -> SpotifyItemType {
        self.item_type
    }
}

fn split(raw: &str) -> Option<(SpotifyItemType, &str)> {
    let mut sections = raw.splitn(3, ':');

    if sections.next()? != "spotify" {
        return None;
    }

    let item_type = SpotifyItemType::from_token(sections.next()?)?;
    let id = sections.next()?;

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some((item_type, id))
}

impl FromStr for SpotifyUri {
    type Err = InvalidUri;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SpotifyUri {
    type Error = InvalidUri;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SpotifyUri> for String {
    fn from(value: SpotifyUri) -> Self {
        value.raw
    }
}

impl Display for SpotifyUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
