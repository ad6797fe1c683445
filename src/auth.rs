//! Request authentication.
//!
//! The surrounding deployment terminates real authentication; by the time a
//! request reaches this service the caller is identified by an `x-user-id`
//! header. The extractor resolves it to a stored user and rejects everything
//! else with 401.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use model::entities::prelude::*;
use model::entities::user;
use sea_orm::EntityTrait;

use crate::error::ApiError;
use crate::schemas::AppState;

/// The authenticated user, resolved from the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user_id: i32 = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let user = User::find_by_id(user_id)
            .one(&state.db)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(AuthUser(user))
    }
}
