use chrono::Duration;
use futures::future::{BoxFuture, FutureExt, Shared};
use spotify_api::clock::Clock;
use spotify_api::pipeline::AccessTokenProvider;
use spotify_api::{AccessToken, AccountsApi, SpotifyApiError, TokenPair};
use std::sync::{Arc, Mutex, PoisonError};

use super::TokenStore;
use crate::error::AuthError;

type SharedRefresh = Shared<BoxFuture<'static, Result<AccessToken, RefreshFailure>>>;

/// Outcome of a failed refresh, cloned to every caller waiting on it
#[derive(Debug, Clone)]
enum RefreshFailure {
    Unauthenticated,
    Rejected(String),
}

impl From<RefreshFailure> for SpotifyApiError {
    fn from(failure: RefreshFailure) -> Self {
        match failure {
            RefreshFailure::Unauthenticated => SpotifyApiError::Unauthenticated,
            RefreshFailure::Rejected(detail) => SpotifyApiError::TokenRefreshFailed(detail),
        }
    }
}

/// Hands out a valid access token for one credential set.
///
/// A token is considered expiring once `now + margin` reaches its expiry.
/// Callers that find an expiring token all wait on the same refresh: at most
/// one request to the token endpoint is in flight per credential set, and
/// every waiter observes the same result. The refresh runs on its own task,
/// so dropping a waiting caller does not abort it.
///
/// When a refresh is rejected the stored tokens are cleared, and later calls
/// fail with [`SpotifyApiError::Unauthenticated`] until the user authorizes
/// again.
#[derive(Clone)]
pub struct TokenRefresher {
    key: Arc<str>,
    store: Arc<dyn TokenStore>,
    accounts_api: Arc<AccountsApi>,
    clock: Arc<dyn Clock>,
    margin: Duration,
    in_flight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl TokenRefresher {
    pub fn new(
        key: impl Into<String>,
        store: Arc<dyn TokenStore>,
        accounts_api: Arc<AccountsApi>,
        clock: Arc<dyn Clock>,
        margin: Duration,
    ) -> Self {
        let key: String = key.into();

        Self {
            key: Arc::from(key),
            store,
            accounts_api,
            clock,
            margin,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Store a freshly issued token pair, replacing whatever was there
    pub fn store_tokens(&self, tokens: TokenPair) -> Result<(), AuthError> {
        self.store.save_tokens(&self.key, tokens)
    }

    /// Whether a token pair is currently stored
    pub fn is_authorized(&self) -> bool {
        self.store.tokens(&self.key).is_some()
    }

    pub async fn valid_access_token(&self) -> Result<AccessToken, SpotifyApiError> {
        let tokens = self
            .store
            .tokens(&self.key)
            .ok_or(SpotifyApiError::Unauthenticated)?;

        if !self.is_expiring(&tokens.access_token) {
            return Ok(tokens.access_token);
        }

        tracing::debug!(
            expires_at = %tokens.access_token.expires_at,
            "Access token expiring, waiting for refresh"
        );

        self.join_refresh().await.map_err(SpotifyApiError::from)
    }

    fn is_expiring(&self, token: &AccessToken) -> bool {
        token.expires_within(self.clock.now(), self.margin)
    }

    /// Join the refresh in flight, starting one if there is none
    fn join_refresh(&self) -> SharedRefresh {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(refresh) = in_flight.as_ref() {
            return refresh.clone();
        }

        let refresher = self.clone();
        let task = tokio::spawn(async move {
            let result = refresher.refresh().await;
            refresher
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            result
        });

        let refresh = async move {
            task.await.unwrap_or_else(|e| {
                Err(RefreshFailure::Rejected(format!(
                    "Refresh task failed: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared();

        *in_flight = Some(refresh.clone());
        refresh
    }

    async fn refresh(&self) -> Result<AccessToken, RefreshFailure> {
        let tokens = self
            .store
            .tokens(&self.key)
            .ok_or(RefreshFailure::Unauthenticated)?;

        // A refresh may have completed between the caller's check and now
        if !self.is_expiring(&tokens.access_token) {
            return Ok(tokens.access_token);
        }

        match self
            .accounts_api
            .refresh_access_token(&tokens.refresh_token)
            .await
        {
            Ok(refreshed) => {
                self.store
                    .save_tokens(&self.key, refreshed.clone())
                    .map_err(|e| RefreshFailure::Rejected(e.to_string()))?;

                tracing::info!(
                    expires_at = %refreshed.access_token.expires_at,
                    "Access token refreshed"
                );

                Ok(refreshed.access_token)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Token refresh failed, authorization required");

                if let Err(clear_error) = self.store.clear_tokens(&self.key) {
                    tracing::error!(error = %clear_error, "Failed to clear rejected tokens");
                }

                let detail = match error {
                    SpotifyApiError::TokenRefreshFailed(detail) => detail,
                    other => other.to_string(),
                };
                Err(RefreshFailure::Rejected(detail))
            }
        }
    }
}

impl AccessTokenProvider for TokenRefresher {
    fn access_token(&self) -> BoxFuture<'_, Result<AccessToken, SpotifyApiError>> {
        self.valid_access_token().boxed()
    }
}
