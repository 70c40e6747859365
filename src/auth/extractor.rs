use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::auth::token;
use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::SharedState;

/// The caller, resolved from an `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token_hash: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Err(AppError::Unauthorized(
                "Authentication credentials were not provided".to_string(),
            ));
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token_hash = token::digest(bearer.token());
        let user = db::auth_tokens::find_user_by_hash(&state.pool, &token_hash)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("User inactive or deleted".to_string()));
        }

        Ok(AuthUser { user, token_hash })
    }
}
