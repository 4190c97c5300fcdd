use axum::{extract::State, Json};

use crate::server::{
    error::ServerError,
    models::{InitiateRequest, InitiateResponse},
    AppState,
};

pub async fn initiate_authorization(
    State(state): State<AppState>,
    Json(req): Json<InitiateRequest>,
) -> Result<Json<InitiateResponse>, ServerError> {
    let redirect_uri = req
        .redirect_uri
        .filter(|uri| !uri.is_empty())
        .unwrap_or_else(|| state.default_redirect_uri.clone());

    let authorization_state = state.authorization_states.begin(redirect_uri)?;
    let authorization_uri = state
        .accounts_api
        .authorization_uri(&state.credentials, &authorization_state)?;

    tracing::info!(
        redirect_uri = %authorization_state.redirect_uri,
        "Initiated authorization"
    );

    Ok(Json(InitiateResponse {
        state: authorization_state.state,
        authorization_uri: authorization_uri.to_string(),
    }))
}
