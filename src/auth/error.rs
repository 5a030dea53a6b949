use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::{auth::dto::ErrorBody, storage::StoreError};

/// Failure kinds of the credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Auth(&'static str),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl CredentialError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(m) | Self::Conflict(m) | Self::NotFound(m) | Self::Auth(m) => *m,
            Self::Storage(_) => "server error",
        }
    }
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        if let Self::Storage(e) = &self {
            error!(error = %e, "user store write failed");
        }
        let body = ErrorBody {
            message: self.public_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
