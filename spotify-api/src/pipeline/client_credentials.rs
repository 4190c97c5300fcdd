use http::header::{HeaderValue, AUTHORIZATION};
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::{HttpRequest, HttpResponse};
use crate::{Credentials, SpotifyApiError};

/// Authenticates Accounts API calls with the application's client id and secret
#[derive(Debug, Clone)]
pub struct ClientCredentialsLayer {
    authorization: HeaderValue,
}

impl ClientCredentialsLayer {
    pub fn new(credentials: &Credentials) -> Result<Self, SpotifyApiError> {
        let mut authorization = HeaderValue::from_str(&credentials.basic_authorization())
            .map_err(|e| SpotifyApiError::InvalidRequest(format!("Invalid credentials: {}", e)))?;
        authorization.set_sensitive(true);

        Ok(Self { authorization })
    }
}

impl<S> Layer<S> for ClientCredentialsLayer {
    type Service = ClientCredentials<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientCredentials {
            inner,
            authorization: self.authorization.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientCredentials<S> {
    inner: S,
    authorization: HeaderValue,
}

impl<S> Service<HttpRequest> for ClientCredentials<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = SpotifyApiError>,
{
    type Response = HttpResponse;
    type Error = SpotifyApiError;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: HttpRequest) -> Self::Future {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.authorization.clone());
        self.inner.call(request)
    }
}
