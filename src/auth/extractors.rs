use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::jwt::UserId;
use crate::{error::AppError, state::AppState};

/// Verifies the `Authorization` header, yielding the caller's user id.
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Header value goes to the verifier as-is; a missing header is an empty credential
        let credential = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        let user_id = state.verifier.verify(credential).await?;
        Ok(AuthUser(user_id))
    }
}
