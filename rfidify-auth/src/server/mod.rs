pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Configuration;
pub use error::ServerError;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use spotify_api::clock::{Clock, SystemClock};
use spotify_api::pipeline::ReqwestTransport;
use spotify_api::{AccountsApi, AccountsApiOptions, Client, Credentials};
use services::{AuthorizationStates, MemoryTokenStore, TokenRefresher, TokenStore};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::AuthError;

/// Largest JSON body accepted by any route
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<Credentials>,
    pub authorization_states: Arc<AuthorizationStates>,
    pub accounts_api: Arc<AccountsApi>,
    pub token_refresher: TokenRefresher,
    pub web_api: Arc<Client>,
    pub default_redirect_uri: String,
}

impl AppState {
    /// Wire up the services described by `configuration`, using the system
    /// clock and the configured token persistence
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, AuthError> {
        let store: Arc<dyn TokenStore> = match configuration.token_path()? {
            Some(path) => Arc::new(MemoryTokenStore::with_persistence(path)?),
            None => Arc::new(MemoryTokenStore::new()),
        };

        Self::with_store(configuration, store, Arc::new(SystemClock))
    }

    pub fn with_store(
        configuration: &Configuration,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let spotify = &configuration.spotify;

        let credentials = Arc::new(Credentials::new(
            spotify.client_id.clone(),
            spotify.client_secret.clone(),
        ));
        let transport =
            ReqwestTransport::new(Duration::from_secs(spotify.request_timeout_seconds))?;

        let accounts_base_url = Url::parse(&spotify.accounts_base_url).map_err(|e| {
            AuthError::Configuration(format!("spotify.accounts_base_url is invalid: {}", e))
        })?;
        let accounts_api = Arc::new(
            AccountsApi::new(
                AccountsApiOptions {
                    base_url: accounts_base_url,
                    scopes: spotify.scopes.clone(),
                },
                &credentials,
                transport.clone(),
            )?
            .with_clock(clock.clone()),
        );

        let token_refresher = TokenRefresher::new(
            credentials.client_id(),
            store.clone(),
            accounts_api.clone(),
            clock.clone(),
            chrono::Duration::seconds(spotify.refresh_margin_seconds),
        );

        let web_api = Arc::new(Client::new(
            spotify.web_api_base_url.clone(),
            Arc::new(token_refresher.clone()),
            transport,
        ));

        let authorization_states = Arc::new(AuthorizationStates::new(
            store,
            clock,
            configuration.server.authorization_ttl_seconds,
        ));

        Ok(Self {
            credentials,
            authorization_states,
            accounts_api,
            token_refresher,
            web_api,
            default_redirect_uri: spotify.redirect_uri.clone(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/authorize/initiate", post(handlers::initiate_authorization))
        .route("/authorize", post(handlers::authorization_callback))
        .route("/playlists", get(handlers::list_playlists))
        .route("/play", put(handlers::start_playback))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}
