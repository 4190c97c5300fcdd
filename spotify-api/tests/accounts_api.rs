use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use url::Url;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use spotify_api::clock::FixedClock;
use spotify_api::pipeline::ReqwestTransport;
use spotify_api::{
    AccountsApi, AccountsApiOptions, AuthorizationState, Credentials, RefreshToken,
    SpotifyApiError,
};

const BASIC_AUTHORIZATION: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn accounts_api(server: &MockServer) -> AccountsApi {
    let options = AccountsApiOptions {
        base_url: Url::parse(&server.uri()).unwrap(),
        scopes: "user-modify-playback-state".to_string(),
    };
    let transport = ReqwestTransport::new(std::time::Duration::from_secs(5)).unwrap();

    AccountsApi::new(
        options,
        &Credentials::new("client-id", "client-secret"),
        transport,
    )
    .unwrap()
    .with_clock(Arc::new(FixedClock(now())))
}

fn authorization_state() -> AuthorizationState {
    AuthorizationState {
        state: "state-123".to_string(),
        redirect_uri: "http://localhost:3000/callback".to_string(),
        created_at: now(),
    }
}

#[tokio::test]
async fn test_exchange_authorization_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("authorization", BASIC_AUTHORIZATION))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "scope": "user-modify-playback-state"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = accounts_api(&server)
        .exchange_authorization_code("auth-code", &authorization_state())
        .await
        .unwrap();

    assert_eq!(tokens.access_token.token, "access-1");
    assert_eq!(tokens.access_token.expires_at, now() + Duration::seconds(3600));
    assert_eq!(tokens.refresh_token.token, "refresh-1");
}

#[tokio::test]
async fn test_exchange_rejected_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = accounts_api(&server)
        .exchange_authorization_code("bad-code", &authorization_state())
        .await
        .unwrap_err();

    match error {
        SpotifyApiError::TokenExchangeFailed(detail) => {
            assert!(detail.contains("invalid_grant"), "{detail}")
        }
        other => panic!("expected TokenExchangeFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exchange_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "unexpected": true })),
        )
        .mount(&server)
        .await;

    let error = accounts_api(&server)
        .exchange_authorization_code("auth-code", &authorization_state())
        .await
        .unwrap_err();

    assert!(matches!(error, SpotifyApiError::TokenExchangeFailed(_)));
}

#[tokio::test]
async fn test_exchange_without_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let error = accounts_api(&server)
        .exchange_authorization_code("auth-code", &authorization_state())
        .await
        .unwrap_err();

    assert!(matches!(error, SpotifyApiError::TokenExchangeFailed(_)));
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("authorization", BASIC_AUTHORIZATION))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-2",
            "token_type": "Bearer",
            "expires_in": 1800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = accounts_api(&server)
        .refresh_access_token(&RefreshToken::new("refresh-1"))
        .await
        .unwrap();

    assert_eq!(tokens.access_token.token, "access-2");
    assert_eq!(tokens.access_token.expires_at, now() + Duration::seconds(1800));
    assert_eq!(tokens.refresh_token, RefreshToken::new("refresh-1"));
}

#[tokio::test]
async fn test_refresh_adopts_rotated_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-2",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-2"
        })))
        .mount(&server)
        .await;

    let tokens = accounts_api(&server)
        .refresh_access_token(&RefreshToken::new("refresh-1"))
        .await
        .unwrap();

    assert_eq!(tokens.refresh_token, RefreshToken::new("refresh-2"));
}

#[tokio::test]
async fn test_refresh_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = accounts_api(&server)
        .refresh_access_token(&RefreshToken::new("refresh-1"))
        .await
        .unwrap_err();

    assert!(matches!(error, SpotifyApiError::TokenRefreshFailed(_)));
}

#[tokio::test]
async fn test_exchange_with_out_of_range_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "expires_in": 1_000_000_000_000_000u64,
            "refresh_token": "refresh-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = accounts_api(&server)
        .exchange_authorization_code("auth-code", &authorization_state())
        .await
        .unwrap_err();

    assert!(
        matches!(error, SpotifyApiError::TokenExchangeFailed(_)),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn test_refresh_with_out_of_range_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-2",
            "token_type": "Bearer",
            "expires_in": 1_000_000_000_000_000u64
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = accounts_api(&server)
        .refresh_access_token(&RefreshToken::new("refresh-1"))
        .await
        .unwrap_err();

    assert!(
        matches!(error, SpotifyApiError::TokenRefreshFailed(_)),
        "unexpected error: {error:?}"
    );
}
