use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use spotify_api::{AuthorizationState, TokenPair};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use super::token_file::TokenFile;
use crate::error::AuthError;

/// Logical persistence for pending authorizations and issued tokens.
///
/// Token pairs are keyed by credential set (the client id) and always
/// written whole, so readers never see an access token without its expiry.
pub trait TokenStore: Send + Sync {
    /// Fails if a record with the same state already exists
    fn insert_authorization_state(&self, state: AuthorizationState) -> Result<(), AuthError>;

    /// Remove and return the record; a second take of the same state yields `None`
    fn take_authorization_state(&self, state: &str) -> Option<AuthorizationState>;

    /// Drop every record matching `expired`, returning how many were removed
    fn purge_authorization_states(&self, expired: &dyn Fn(&AuthorizationState) -> bool)
        -> usize;

    fn tokens(&self, key: &str) -> Option<TokenPair>;

    fn save_tokens(&self, key: &str, tokens: TokenPair) -> Result<(), AuthError>;

    fn clear_tokens(&self, key: &str) -> Result<(), AuthError>;
}

/// In-memory store, optionally mirroring tokens to a JSON file
pub struct MemoryTokenStore {
    states: DashMap<String, AuthorizationState>,
    tokens: DashMap<String, TokenPair>,
    file: Option<TokenFile>,
    file_lock: Mutex<()>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            tokens: DashMap::new(),
            file: None,
            file_lock: Mutex::new(()),
        }
    }

    /// Load previously saved tokens from `token_path` and keep it up to date
    pub fn with_persistence(token_path: PathBuf) -> Result<Self, AuthError> {
        let file = TokenFile::new(token_path)?;
        let tokens: DashMap<String, TokenPair> = file.load()?.into_iter().collect();

        tracing::info!(
            path = %file.path().display(),
            credential_sets = tokens.len(),
            "Token store loaded"
        );

        Ok(Self {
            states: DashMap::new(),
            tokens,
            file: Some(file),
            file_lock: Mutex::new(()),
        })
    }

    fn persist(&self) -> Result<(), AuthError> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        // Snapshot under the lock so concurrent writers land in order
        let _guard = self.file_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot: HashMap<String, TokenPair> = self
            .tokens
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        file.save(&snapshot)
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn insert_authorization_state(&self, state: AuthorizationState) -> Result<(), AuthError> {
        match self.states.entry(state.state.clone()) {
            Entry::Occupied(_) => Err(AuthError::TokenStorage(
                "Authorization state already exists".to_string(),
            )),
            Entry::Vacant(entry) => {
                entry.insert(state);
                Ok(())
            }
        }
    }

    fn take_authorization_state(&self, state: &str) -> Option<AuthorizationState> {
        self.states.remove(state).map(|(_, record)| record)
    }

    fn purge_authorization_states(
        &self,
        expired: &dyn Fn(&AuthorizationState) -> bool,
    ) -> usize {
        let initial_count = self.states.len();
        self.states.retain(|_, record| !expired(record));
        initial_count.saturating_sub(self.states.len())
    }

    fn tokens(&self, key: &str) -> Option<TokenPair> {
        self.tokens.get(key).map(|tokens| tokens.clone())
    }

    fn save_tokens(&self, key: &str, tokens: TokenPair) -> Result<(), AuthError> {
        self.tokens.insert(key.to_string(), tokens);
        self.persist()
    }

    fn clear_tokens(&self, key: &str) -> Result<(), AuthError> {
        self.tokens.remove(key);
        self.persist()
    }
}
