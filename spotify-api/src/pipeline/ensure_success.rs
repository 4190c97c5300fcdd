use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::{HttpRequest, HttpResponse};
use crate::SpotifyApiError;

/// Turns every non-2xx response into [`SpotifyApiError::Upstream`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureSuccessLayer;

impl<S> Layer<S> for EnsureSuccessLayer {
    type Service = EnsureSuccess<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EnsureSuccess { inner }
    }
}

#[derive(Debug, Clone)]
pub struct EnsureSuccess<S> {
    inner: S,
}

impl<S> Service<HttpRequest> for EnsureSuccess<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = SpotifyApiError>,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = SpotifyApiError;
    type Future = BoxFuture<'static, Result<HttpResponse, SpotifyApiError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            let body = String::from_utf8_lossy(response.body()).into_owned();
            Err(SpotifyApiError::Upstream { status, body })
        })
    }
}
