use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::UserRole;
use crate::services::token;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

// Bearer JWT extractor; claims не перепроверяются по БД
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = token::decode_access_token(token, &state.config.jwt)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
            first_name: claims.given_name,
            last_name: claims.family_name,
            role: claims.role,
        })
    }
}

// Для эндпоинтов, где авторизация опциональна (публичный список событий)
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl FromRequestParts<Arc<crate::AppState>> for OptionalAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = match bearer_token(parts) {
            Some(token) => token::decode_access_token(token, &state.config.jwt)
                .ok()
                .map(|claims| AuthUser {
                    user_id: claims.sub,
                    email: claims.email,
                    first_name: claims.given_name,
                    last_name: claims.family_name,
                    role: claims.role,
                }),
            None => None,
        };
        Ok(OptionalAuthUser(user))
    }
}
