//! Identity collaborator: bearer-token authentication backing the
//! `CurrentUser` extractor. Pure gate — pricing and ranking never see it.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api::AppState;
use crate::error::AppError;
use crate::types::User;

/// Authenticated caller, resolved from `Authorization: Bearer <token>`
/// against the users table. Handlers that take this reject with 401 before
/// any workflow runs.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a bearer token".to_string()))?;

        let user = state
            .store
            .user_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown token".to_string()))?;

        Ok(CurrentUser(user))
    }
}
