use futures::future::BoxFuture;
use reqwest::Client;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

use super::{HttpRequest, HttpResponse};
use crate::SpotifyApiError;

/// Innermost pipeline stage: performs the request with reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, SpotifyApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Service<HttpRequest> for ReqwestTransport {
    type Response = HttpResponse;
    type Error = SpotifyApiError;
    type Future = BoxFuture<'static, Result<HttpResponse, SpotifyApiError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let client = self.client.clone();

        Box::pin(async move {
            let (parts, body) = request.into_parts();

            let response = client
                .request(parts.method, parts.uri.to_string())
                .headers(parts.headers)
                .body(body)
                .send()
                .await?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();

            let mut http_response = HttpResponse::new(body);
            *http_response.status_mut() = status;
            *http_response.headers_mut() = headers;

            Ok(http_response)
        })
    }
}
