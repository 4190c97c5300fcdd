use base64::Engine;
use rand::Rng;
use spotify_api::clock::Clock;
use spotify_api::AuthorizationState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::TokenStore;
use crate::error::AuthError;

/// Creates and consumes pending authorization requests.
///
/// A state nonce is handed out by [`AuthorizationStates::begin`] and accepted
/// at most once by [`AuthorizationStates::consume`]. Records older than the
/// TTL are never accepted and are swept by [`AuthorizationStates::spawn_cleanup`].
pub struct AuthorizationStates {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl AuthorizationStates {
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, ttl_seconds: u64) -> Self {
        tracing::info!(
            "Authorization states initialized with TTL of {} seconds",
            ttl_seconds
        );

        Self {
            store,
            clock,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Start a new authorization for `redirect_uri`
    pub fn begin(&self, redirect_uri: impl Into<String>) -> Result<AuthorizationState, AuthError> {
        let authorization_state = AuthorizationState {
            state: generate_state_token(),
            redirect_uri: redirect_uri.into(),
            created_at: self.clock.now(),
        };

        self.store
            .insert_authorization_state(authorization_state.clone())?;

        tracing::debug!(
            redirect_uri = %authorization_state.redirect_uri,
            "Created authorization state"
        );

        Ok(authorization_state)
    }

    /// Take the pending authorization for `state`.
    ///
    /// The record is deleted whether or not the caller's token exchange later
    /// succeeds, so a callback can never be replayed.
    pub fn consume(&self, state: &str) -> Result<AuthorizationState, AuthError> {
        let authorization_state = self
            .store
            .take_authorization_state(state)
            .ok_or(AuthError::StateNotFound)?;

        if self.is_expired(&authorization_state) {
            tracing::warn!(
                created_at = %authorization_state.created_at,
                "Rejected expired authorization state"
            );
            return Err(AuthError::StateNotFound);
        }

        Ok(authorization_state)
    }

    /// Remove expired records, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        self.store
            .purge_authorization_states(&|record| self.is_expired(record))
    }

    /// Background task that periodically purges expired records
    pub fn spawn_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let states = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;

                let cleaned = states.purge_expired();
                if cleaned > 0 {
                    tracing::info!("Cleaned up {} expired authorization states", cleaned);
                }
            }
        })
    }

    fn is_expired(&self, authorization_state: &AuthorizationState) -> bool {
        let age = self
            .clock
            .now()
            .signed_duration_since(authorization_state.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        age >= self.ttl
    }
}

/// Generate a random, URL-safe state nonce
pub fn generate_state_token() -> String {
    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.random()).collect();
    base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(&random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::services::MemoryTokenStore;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;

    /// Clock the test can move forward
    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, seconds: i64) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn setup() -> (AuthorizationStates, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(Mutex::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        )));
        let states = AuthorizationStates::new(Arc::new(MemoryTokenStore::new()), clock.clone(), 600);
        (states, clock)
    }

    #[test]
    fn test_state_tokens_are_unique_and_url_safe() {
        let first = generate_state_token();
        let second = generate_state_token();

        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_begin_then_consume_once() {
        let (states, _clock) = setup();

        let created = states.begin("http://localhost:3000/callback").unwrap();
        assert_eq!(created.redirect_uri, "http://localhost:3000/callback");

        let consumed = states.consume(&created.state).unwrap();
        assert_eq!(consumed, created);
        assert!(matches!(
            states.consume(&created.state),
            Err(AuthError::StateNotFound)
        ));
    }

    #[test]
    fn test_unknown_state_is_not_found() {
        let (states, _clock) = setup();
        assert!(matches!(
            states.consume("never-issued"),
            Err(AuthError::StateNotFound)
        ));
    }

    #[test]
    fn test_expired_state_is_rejected() {
        let (states, clock) = setup();
        let created = states.begin("http://localhost/cb").unwrap();

        clock.advance(600);

        assert!(matches!(
            states.consume(&created.state),
            Err(AuthError::StateNotFound)
        ));
    }

    #[test]
    fn test_purge_expired() {
        let (states, clock) = setup();
        let old = states.begin("http://localhost/cb").unwrap();
        clock.advance(300);
        let recent = states.begin("http://localhost/cb").unwrap();
        clock.advance(301);

        assert_eq!(states.purge_expired(), 1);
        assert!(states.consume(&old.state).is_err());
        assert!(states.consume(&recent.state).is_ok());
    }
}
