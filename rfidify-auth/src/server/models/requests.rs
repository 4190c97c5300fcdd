use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::server::error::ServerError;

// POST /authorize/initiate
#[derive(Debug, Default, Deserialize)]
pub struct InitiateRequest {
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitiateResponse {
    pub state: String,
    pub authorization_uri: String,
}

// POST /authorize
#[derive(Debug, Default, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A callback that passed validation
#[derive(Debug, PartialEq)]
pub enum CallbackOutcome {
    Granted { code: String, state: String },
    Denied { error: String },
}

impl CallbackRequest {
    /// `state` is always required, plus exactly one of `code` or `error`.
    /// Empty strings count as missing.
    pub fn validate(self) -> Result<CallbackOutcome, ServerError> {
        let code = self.code.filter(|code| !code.is_empty());
        let state = self.state.filter(|state| !state.is_empty());
        let error = self.error.filter(|error| !error.is_empty());

        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if state.is_none() {
            errors
                .entry("state".to_string())
                .or_default()
                .push("'State' must not be empty.".to_string());
        }
        match (&code, &error) {
            (None, None) => {
                errors
                    .entry("code".to_string())
                    .or_default()
                    .push("'Code' must not be empty when no error is given.".to_string());
                errors
                    .entry("error".to_string())
                    .or_default()
                    .push("'Error' must not be empty when no code is given.".to_string());
            }
            (Some(_), Some(_)) => {
                errors
                    .entry("code".to_string())
                    .or_default()
                    .push("'Code' must be empty when an error is given.".to_string());
            }
            _ => {}
        }

        if !errors.is_empty() {
            return Err(ServerError::validation(errors));
        }

        match (code, state, error) {
            (_, _, Some(error)) => Ok(CallbackOutcome::Denied { error }),
            (Some(code), Some(state), None) => Ok(CallbackOutcome::Granted { code, state }),
            _ => Err(ServerError::BadRequest("Invalid callback".to_string())),
        }
    }
}

// GET /playlists
#[derive(Debug, Default, Deserialize)]
pub struct PlaylistsParams {
    #[serde(default)]
    pub offset: Option<u32>,
}

// PUT /play
#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub uri: String,
}

// Health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
