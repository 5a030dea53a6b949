use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        error::CredentialError,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Parses a JSON body without requiring a content type. An empty body reads
/// as `{}`.
fn parse_body<T: DeserializeOwned + Default>(raw: &[u8]) -> Result<T, CredentialError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(raw).map_err(|e| {
        warn!(error = %e, "rejected request body");
        CredentialError::Validation("invalid request body")
    })
}

/// Storage failures are logged where they become a response.
fn log_rejection(action: &'static str, err: &CredentialError) {
    if !matches!(err, CredentialError::Storage(_)) {
        warn!(action, error = %err, "request rejected");
    }
}

#[instrument(skip(state, raw))]
pub async fn register(
    State(state): State<AppState>,
    raw: Bytes,
) -> Result<(StatusCode, Json<PublicUser>), CredentialError> {
    let payload: RegisterRequest = parse_body(&raw)?;
    let name = payload.name.as_deref().unwrap_or_default().trim();
    let email = payload.email.as_deref().unwrap_or_default().trim();
    let password = payload.password.as_deref().unwrap_or_default();
    // Clients that do not send a confirmation are not asked for one.
    let confirm = payload.confirm.as_deref().unwrap_or(password);

    let user = state
        .credentials
        .register(name, email, password, confirm)
        .await
        .inspect_err(|e| log_rejection("register", e))?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, raw))]
pub async fn login(
    State(state): State<AppState>,
    raw: Bytes,
) -> Result<Json<PublicUser>, CredentialError> {
    let payload: LoginRequest = parse_body(&raw)?;
    let email = payload.email.as_deref().unwrap_or_default().trim();
    let password = payload.password.as_deref().unwrap_or_default();

    let user = state
        .credentials
        .login(email, password)
        .await
        .inspect_err(|e| log_rejection("login", e))?;

    Ok(Json(user))
}
