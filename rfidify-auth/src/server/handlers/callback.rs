use axum::{extract::State, http::StatusCode, Json};
use std::collections::BTreeMap;

use crate::server::{
    error::ServerError,
    models::{CallbackOutcome, CallbackRequest},
    AppState,
};

pub async fn authorization_callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> Result<StatusCode, ServerError> {
    complete_authorization(&state, req).await?;
    Ok(StatusCode::OK)
}

/// Finish a pending authorization.
///
/// A denied callback leaves the pending state in place; it expires with the
/// TTL. A granted callback consumes the state before the code is exchanged,
/// so the same callback cannot be replayed even if the exchange fails.
pub async fn complete_authorization(
    state: &AppState,
    req: CallbackRequest,
) -> Result<(), ServerError> {
    let (code, nonce) = match req.validate()? {
        CallbackOutcome::Granted { code, state } => (code, state),
        CallbackOutcome::Denied { error } => {
            tracing::warn!(error = %error, "Authorization denied by Spotify");

            return Err(ServerError::Validation {
                title: "An error occurred while authorizing with Spotify".to_string(),
                errors: BTreeMap::from([("error".to_string(), vec![error])]),
            });
        }
    };

    let authorization_state = state.authorization_states.consume(&nonce)?;

    let tokens = state
        .accounts_api
        .exchange_authorization_code(&code, &authorization_state)
        .await?;

    state.token_refresher.store_tokens(tokens)?;

    tracing::info!("Authorization completed");

    Ok(())
}
