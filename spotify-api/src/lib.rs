pub mod accounts;
pub mod clock;
pub mod endpoints;
mod error;
mod macros;
mod models;
pub mod pipeline;
pub mod repositories;
mod uri;

pub use crate::accounts::{AccountsApi, AccountsApiOptions};
pub use crate::error::{ErrorDetail, ErrorResponse, SpotifyApiError};
pub use crate::models::{AccessToken, AuthorizationState, Credentials, RefreshToken, TokenPair};
pub use crate::uri::{InvalidUri, SpotifyItemType, SpotifyUri};

use endpoints::Request as ApiRequest;
use http::header::{ACCEPT, CONTENT_TYPE};
use pipeline::{AccessTokenProvider, HttpRequest, HttpResponse, HttpService};
use repositories::*;
use std::sync::Arc;
use tower::{Service, ServiceExt};
use url::Url;

pub const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const WEB_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Web API client; every call goes through the bearer-token pipeline
pub struct Client {
    inner: HttpService,
    base_url: String,
}

impl Client {
    pub fn new<T>(
        base_url: impl Into<String>,
        tokens: Arc<dyn AccessTokenProvider>,
        transport: T,
    ) -> Self
    where
        T: Service<HttpRequest, Response = HttpResponse, Error = SpotifyApiError>
            + Clone
            + Send
            + Sync
            + 'static,
        T::Future: Send + 'static,
    {
        Self {
            inner: pipeline::web_api_pipeline(transport, tokens),
            base_url: base_url.into(),
        }
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, SpotifyApiError>
    where
        R: ApiRequest,
    {
        let http_request = self.build_request(&request)?;
        let response = self.inner.clone().oneshot(http_request).await?;

        // 204 and friends come back empty
        let body = match response.body().as_slice() {
            [] => b"null".as_slice(),
            body => body,
        };

        Ok(serde_json::from_slice(body)?)
    }

    fn build_request<R>(&self, request: &R) -> Result<HttpRequest, SpotifyApiError>
    where
        R: ApiRequest,
    {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            request.endpoint()
        ))?;

        let query = request.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut builder = http::Request::builder()
            .method(request.method())
            .uri(url.as_str())
            .header(ACCEPT, "application/json");

        let body = match request.body()? {
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                body
            }
            None => Vec::new(),
        };

        Ok(builder.body(body)?)
    }
}

pub struct Request;

impl Request {
    pub fn new() -> Self {
        Self {}
    }

    pub fn playlists() -> PlaylistRepository {
        PlaylistRepository::new()
    }

    pub fn player() -> PlayerRepository {
        PlayerRepository::new()
    }
}
