use chrono::Duration;
use futures::future::{BoxFuture, FutureExt};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::{
    AsyncHttpClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, RedirectUrl,
    RefreshToken as OAuthRefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use std::sync::Arc;
use tower::{Service, ServiceExt};
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::pipeline::{self, HttpRequest, HttpResponse, HttpService};
use crate::{AccessToken, AuthorizationState, Credentials, RefreshToken, SpotifyApiError, TokenPair};

#[derive(Debug, Clone)]
pub struct AccountsApiOptions {
    /// Root of the accounts service, e.g. `https://accounts.spotify.com`
    pub base_url: Url,
    /// Space separated OAuth scopes requested during authorization
    pub scopes: String,
}

/// Client for the Spotify Accounts service (authorization and token endpoints)
pub struct AccountsApi {
    pipeline: HttpService,
    client_id: ClientId,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    scopes: String,
    clock: Arc<dyn Clock>,
}

impl AccountsApi {
    pub fn new<T>(
        options: AccountsApiOptions,
        credentials: &Credentials,
        transport: T,
    ) -> Result<Self, SpotifyApiError>
    where
        T: Service<HttpRequest, Response = HttpResponse, Error = SpotifyApiError>
            + Clone
            + Send
            + Sync
            + 'static,
        T::Future: Send + 'static,
    {
        let mut base_url = options.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            pipeline: pipeline::accounts_pipeline(transport, credentials)?,
            client_id: ClientId::new(credentials.client_id().to_string()),
            auth_url: AuthUrl::from_url(base_url.join("authorize")?),
            token_url: TokenUrl::from_url(base_url.join("api/token")?),
            scopes: options.scopes,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the browser-facing authorization URL for a pending authorization
    pub fn authorization_uri(
        &self,
        credentials: &Credentials,
        authorization_state: &AuthorizationState,
    ) -> Result<Url, SpotifyApiError> {
        let redirect_url = RedirectUrl::new(authorization_state.redirect_uri.clone())?;
        let csrf_token = CsrfToken::new(authorization_state.state.clone());

        let client = BasicClient::new(ClientId::new(credentials.client_id().to_string()))
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(redirect_url);

        let mut request = client.authorize_url(|| csrf_token);
        if !self.scopes.is_empty() {
            request = request.add_scope(Scope::new(self.scopes.clone()));
        }
        let (url, _) = request.add_extra_param("show_dialog", "true").url();

        Ok(url)
    }

    /// Exchange an authorization code for an access and refresh token pair
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        authorization_state: &AuthorizationState,
    ) -> Result<TokenPair, SpotifyApiError> {
        let redirect_url = RedirectUrl::new(authorization_state.redirect_uri.clone())
            .map_err(|e| SpotifyApiError::TokenExchangeFailed(format!("Invalid redirect URI: {}", e)))?;
        let http_client = PipelineClient(self.pipeline.clone());

        let response = BasicClient::new(self.client_id.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(redirect_url)
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| SpotifyApiError::TokenExchangeFailed(token_error_detail(e)))?;

        let tokens = self
            .token_pair(&response, None)
            .map_err(SpotifyApiError::TokenExchangeFailed)?;

        tracing::debug!(
            expires_at = %tokens.access_token.expires_at,
            "Exchanged authorization code for tokens"
        );

        Ok(tokens)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Spotify only sometimes rotates the refresh token; when the response
    /// carries none the one passed in is kept.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<TokenPair, SpotifyApiError> {
        let oauth_refresh_token = OAuthRefreshToken::new(refresh_token.token.clone());
        let http_client = PipelineClient(self.pipeline.clone());

        let response = BasicClient::new(self.client_id.clone())
            .set_token_uri(self.token_url.clone())
            .exchange_refresh_token(&oauth_refresh_token)
            .request_async(&http_client)
            .await
            .map_err(|e| SpotifyApiError::TokenRefreshFailed(token_error_detail(e)))?;

        let tokens = self
            .token_pair(&response, Some(refresh_token))
            .map_err(SpotifyApiError::TokenRefreshFailed)?;

        tracing::debug!(
            expires_at = %tokens.access_token.expires_at,
            "Refreshed access token"
        );

        Ok(tokens)
    }

    fn token_pair(
        &self,
        response: &BasicTokenResponse,
        previous_refresh_token: Option<&RefreshToken>,
    ) -> Result<TokenPair, String> {
        let expires_in = response
            .expires_in()
            .ok_or_else(|| "No expiration time in response".to_string())?;
        let expires_in = Duration::from_std(expires_in)
            .map_err(|e| format!("Invalid expiration time: {}", e))?;

        let refresh_token = match (response.refresh_token(), previous_refresh_token) {
            (Some(token), _) => RefreshToken::new(token.secret().clone()),
            (None, Some(previous)) => previous.clone(),
            (None, None) => return Err("No refresh token in response".to_string()),
        };

        let expires_at = self
            .clock
            .now()
            .checked_add_signed(expires_in)
            .ok_or_else(|| "Invalid expiration time".to_string())?;

        Ok(TokenPair {
            access_token: AccessToken::new(response.access_token().secret().clone(), expires_at),
            refresh_token,
        })
    }
}

/// Sends oauth2 token requests through the Accounts pipeline
struct PipelineClient(HttpService);

impl<'c> AsyncHttpClient<'c> for PipelineClient {
    type Error = SpotifyApiError;
    type Future = BoxFuture<'c, Result<HttpResponse, SpotifyApiError>>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        self.0.clone().oneshot(request).boxed()
    }
}

fn token_error_detail(error: RequestTokenError<SpotifyApiError, BasicErrorResponse>) -> String {
    match error {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        RequestTokenError::Request(e) => e.to_string(),
        RequestTokenError::Parse(e, _) => format!("Malformed token response: {}", e),
        RequestTokenError::Other(message) => message,
    }
}
