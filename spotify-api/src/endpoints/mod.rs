pub mod player;
pub mod playlists;

use http::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A typed Web API call: where it goes and what comes back
pub trait Request {
    type Response: DeserializeOwned;

    fn method(&self) -> Method {
        Method::GET
    }

    /// Path relative to the Web API base URL, starting with `/`
    fn endpoint(&self) -> Cow<'_, str>;

    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// JSON body, if the call carries one
    fn body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        Ok(None)
    }
}

/// Offset-based page wrapper used by the Web API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub href: String,
    pub items: Vec<T>,
    pub limit: u32,
    pub next: Option<String>,
    pub offset: u32,
    pub previous: Option<String>,
    pub total: u32,
}

impl<T> PagedResponse<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}
