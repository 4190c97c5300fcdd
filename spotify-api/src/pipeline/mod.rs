//! Outbound request pipeline shared by the Accounts API and Web API clients.
//!
//! Every call passes through the same stages, outermost first:
//!
//! 1. [`EnsureSuccessLayer`] turns non-2xx responses into [`SpotifyApiError::Upstream`]
//! 2. [`LoggingLayer`] records the request and its outcome
//! 3. credentials: [`ClientCredentialsLayer`] for the Accounts API, or
//!    [`BearerTokenLayer`] for the Web API
//! 4. the transport, normally [`ReqwestTransport`]

mod bearer_token;
mod client_credentials;
mod ensure_success;
mod logging;
mod transport;

pub use bearer_token::{AccessTokenProvider, BearerToken, BearerTokenLayer};
pub use client_credentials::{ClientCredentials, ClientCredentialsLayer};
pub use ensure_success::{EnsureSuccess, EnsureSuccessLayer};
pub use logging::{Logging, LoggingLayer};
pub use transport::ReqwestTransport;

use std::sync::Arc;
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceBuilder};

use crate::{Credentials, SpotifyApiError};

pub type HttpRequest = http::Request<Vec<u8>>;
pub type HttpResponse = http::Response<Vec<u8>>;
pub type HttpService = BoxCloneSyncService<HttpRequest, HttpResponse, SpotifyApiError>;

/// Pipeline for the Accounts API, authenticated with client credentials
pub fn accounts_pipeline<T>(
    transport: T,
    credentials: &Credentials,
) -> Result<HttpService, SpotifyApiError>
where
    T: Service<HttpRequest, Response = HttpResponse, Error = SpotifyApiError>
        + Clone
        + Send
        + Sync
        + 'static,
    T::Future: Send + 'static,
{
    let service = ServiceBuilder::new()
        .layer(EnsureSuccessLayer)
        .layer(LoggingLayer::new("accounts"))
        .layer(ClientCredentialsLayer::new(credentials)?)
        .service(transport);

    Ok(BoxCloneSyncService::new(service))
}

/// Pipeline for the Web API, authenticated with a refreshed bearer token
pub fn web_api_pipeline<T>(transport: T, tokens: Arc<dyn AccessTokenProvider>) -> HttpService
where
    T: Service<HttpRequest, Response = HttpResponse, Error = SpotifyApiError>
        + Clone
        + Send
        + Sync
        + 'static,
    T::Future: Send + 'static,
{
    let service = ServiceBuilder::new()
        .layer(EnsureSuccessLayer)
        .layer(LoggingLayer::new("web"))
        .layer(BearerTokenLayer::new(tokens))
        .service(transport);

    BoxCloneSyncService::new(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccessToken;
    use chrono::{Duration, Utc};
    use futures::future::BoxFuture;
    use http::header::AUTHORIZATION;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use tracing_subscriber::layer::SubscriberExt;

    /// Collects the fields of every tracing event as `name=value` text
    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<Mutex<Vec<String>>>);

    impl CapturedEvents {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CapturedEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut visitor = FieldVisitor(String::new());
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.0);
        }
    }

    struct FieldVisitor(String);

    impl tracing::field::Visit for FieldVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.push_str(&format!("{}={:?} ", field.name(), value));
        }
    }

    struct StaticToken(Option<AccessToken>);

    impl AccessTokenProvider for StaticToken {
        fn access_token(&self) -> BoxFuture<'_, Result<AccessToken, SpotifyApiError>> {
            Box::pin(async move { self.0.clone().ok_or(SpotifyApiError::Unauthenticated) })
        }
    }

    /// Fake transport answering every request with a fixed status and body,
    /// remembering the last Authorization header it saw
    #[derive(Clone, Default)]
    struct FakeTransport {
        status: u16,
        body: &'static str,
        calls: Arc<AtomicUsize>,
        last_authorization: Arc<Mutex<Option<String>>>,
    }

    impl FakeTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                ..Default::default()
            }
        }
    }

    impl Service<HttpRequest> for FakeTransport {
        type Response = HttpResponse;
        type Error = SpotifyApiError;
        type Future = BoxFuture<'static, Result<HttpResponse, SpotifyApiError>>;

        fn poll_ready(
            &mut self,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: HttpRequest) -> Self::Future {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_authorization.lock().unwrap() = request
                .headers()
                .get(AUTHORIZATION)
                .map(|value| value.to_str().unwrap().to_string());

            let mut response = HttpResponse::new(self.body.as_bytes().to_vec());
            *response.status_mut() = StatusCode::from_u16(self.status).unwrap();
            Box::pin(async move { Ok(response) })
        }
    }

    fn get(uri: &str) -> HttpRequest {
        http::Request::get(uri).body(Vec::new()).unwrap()
    }

    fn valid_token() -> Arc<dyn AccessTokenProvider> {
        Arc::new(StaticToken(Some(AccessToken::new(
            "access-123",
            Utc::now() + Duration::hours(1),
        ))))
    }

    #[tokio::test]
    async fn test_server_error_becomes_upstream_error_and_is_logged() {
        let events = CapturedEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));

        let transport = FakeTransport::new(500, "boom");
        let pipeline = web_api_pipeline(transport, valid_token());

        let error = pipeline
            .oneshot(get("https://api.spotify.com/v1/me/playlists"))
            .await
            .unwrap_err();

        match error {
            SpotifyApiError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }

        let lines = events.lines();
        assert!(
            lines
                .iter()
                .any(|line| line.contains("status=500") && line.contains("/me/playlists")),
            "logging stage did not record the failing status: {lines:?}"
        );
    }

    #[tokio::test]
    async fn test_success_passes_body_through_untouched() {
        let transport = FakeTransport::new(200, r#"{"items":[]}"#);
        let pipeline = web_api_pipeline(transport, valid_token());

        let response = pipeline
            .oneshot(get("https://api.spotify.com/v1/me/playlists"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), br#"{"items":[]}"#);
    }

    #[tokio::test]
    async fn test_bearer_token_is_attached() {
        let transport = FakeTransport::new(204, "");
        let last_authorization = transport.last_authorization.clone();
        let pipeline = web_api_pipeline(transport, valid_token());

        pipeline
            .oneshot(get("https://api.spotify.com/v1/me/player/play"))
            .await
            .unwrap();

        assert_eq!(
            last_authorization.lock().unwrap().as_deref(),
            Some("Bearer access-123")
        );
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_calling_upstream() {
        let transport = FakeTransport::new(200, "{}");
        let calls = transport.calls.clone();
        let pipeline = web_api_pipeline(transport, Arc::new(StaticToken(None)));

        let error = pipeline
            .oneshot(get("https://api.spotify.com/v1/me/playlists"))
            .await
            .unwrap_err();

        assert!(matches!(error, SpotifyApiError::Unauthenticated));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_accounts_pipeline_uses_client_credentials() {
        let transport = FakeTransport::new(200, "{}");
        let last_authorization = transport.last_authorization.clone();
        let credentials = Credentials::new("client", "secret");
        let pipeline = accounts_pipeline(transport, &credentials).unwrap();

        pipeline
            .oneshot(get("https://accounts.spotify.com/api/token"))
            .await
            .unwrap();

        assert_eq!(
            last_authorization.lock().unwrap().as_deref(),
            Some("Basic Y2xpZW50OnNlY3JldA==")
        );
    }

    #[tokio::test]
    async fn test_accounts_pipeline_normalizes_client_errors() {
        let transport = FakeTransport::new(400, r#"{"error":"invalid_grant"}"#);
        let credentials = Credentials::new("client", "secret");
        let pipeline = accounts_pipeline(transport, &credentials).unwrap();

        let error = pipeline
            .oneshot(get("https://accounts.spotify.com/api/token"))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    }
}
