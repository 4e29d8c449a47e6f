use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::storage::StoreError;

/// Body sent for every rejected request.
pub const REJECTED_BODY: &str = "Invalid token";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("storage failed: {0}")]
    Storage(#[from] StoreError),
}

impl AppError {
    /// Status sent to the client. Storage failures share the auth
    /// rejection so callers see a single failure shape.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Auth(e) => warn!(error = %e, "request rejected: authentication"),
            AppError::Storage(e) => error!(error = %e, "request rejected: storage"),
        }
        (self.status(), REJECTED_BODY).into_response()
    }
}
