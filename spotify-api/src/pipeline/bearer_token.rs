use futures::future::BoxFuture;
use http::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::{HttpRequest, HttpResponse};
use crate::{AccessToken, SpotifyApiError};

/// Hands out an access token that is valid right now, refreshing it first if needed.
///
/// Implementations return [`SpotifyApiError::Unauthenticated`] when no token can
/// be produced at all.
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, Result<AccessToken, SpotifyApiError>>;
}

/// Attaches a bearer token from an [`AccessTokenProvider`] to every Web API call
#[derive(Clone)]
pub struct BearerTokenLayer {
    tokens: Arc<dyn AccessTokenProvider>,
}

impl BearerTokenLayer {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for BearerTokenLayer {
    type Service = BearerToken<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerToken {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BearerToken<S> {
    inner: S,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl<S> Service<HttpRequest> for BearerToken<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = SpotifyApiError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = SpotifyApiError;
    type Future = BoxFuture<'static, Result<HttpResponse, SpotifyApiError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: HttpRequest) -> Self::Future {
        // Keep the service that was driven to readiness for this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let tokens = self.tokens.clone();

        Box::pin(async move {
            let token = tokens.access_token().await?;

            let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.token))
                .map_err(|e| SpotifyApiError::InvalidRequest(format!("Invalid access token: {}", e)))?;
            authorization.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, authorization);

            inner.call(request).await
        })
    }
}
