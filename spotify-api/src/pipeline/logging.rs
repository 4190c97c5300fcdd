use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::{HttpRequest, HttpResponse};
use crate::SpotifyApiError;

/// Records method, URI and outcome of every call without touching it
#[derive(Debug, Clone, Copy)]
pub struct LoggingLayer {
    api: &'static str,
}

impl LoggingLayer {
    pub fn new(api: &'static str) -> Self {
        Self { api }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            api: self.api,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    api: &'static str,
}

impl<S> Service<HttpRequest> for Logging<S>
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
        let api = self.api;
        let method = request.method().clone();
        let uri = request.uri().clone();

        tracing::info!(api, %method, %uri, "Sending HTTP request");

        let future = self.inner.call(request);

        Box::pin(async move {
            let result = future.await;

            match &result {
                Ok(response) => tracing::info!(
                    api,
                    %method,
                    %uri,
                    status = response.status().as_u16(),
                    "Received HTTP response"
                ),
                Err(error) => tracing::warn!(
                    api,
                    %method,
                    %uri,
                    error = %error,
                    "HTTP request failed"
                ),
            }

            result
        })
    }
}
