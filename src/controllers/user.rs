use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{api_error, internal_error, ApiError};
use crate::middleware::AuthUser;
use crate::models::user::{User, UserDto};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
        .route("/users", get(list_users))
        .route("/users/{id}/status", put(set_user_status))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = User::find_by_id(user.user_id, &state.db)
        .await
        .map_err(|e| internal_error("get profile: lookup failed", e))?;

    match profile {
        Some(profile) => Ok(Json(UserDto::from(&profile))),
        None => Err(api_error(StatusCode::NOT_FOUND, "User not found")),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let updated: User = sqlx::query_as(
        "UPDATE users SET
             first_name = COALESCE($2, first_name),
             last_name = COALESCE($3, last_name),
             profile_image_url = COALESCE($4, profile_image_url),
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(user.user_id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.profile_image_url)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| internal_error("update profile: update failed", e))?;

    Ok(Json(UserDto::from(&updated)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let account = User::find_by_id(user.user_id, &state.db)
        .await
        .map_err(|e| internal_error("change password: lookup failed", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))?;

    // У Google-аккаунтов пароля нет
    if account.is_google_auth {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Password change is not available for Google accounts",
        ));
    }
    if !account.verify_password(&req.current_password) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Current password is incorrect",
        ));
    }

    let password_hash = bcrypt::hash(&req.new_password, bcrypt::DEFAULT_COST)
        .map_err(|e| internal_error("change password: hashing failed", e))?;

    // Смена пароля закрывает все сессии
    sqlx::query(
        "UPDATE users SET
             password_hash = $2,
             refresh_token = NULL,
             refresh_token_expires_at = NULL,
             updated_at = NOW()
         WHERE id = $1",
    )
    .bind(account.id)
    .bind(&password_hash)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("change password: update failed", e))?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Password changed successfully" })),
    ))
}

/* ---------- admin user management ---------- */

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<i64>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUsersQuery>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin() {
        return Err(api_error(StatusCode::FORBIDDEN, "Admin access required"));
    }

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("list users: count failed", e))?;

    let users: Vec<User> = sqlx::query_as(
        "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| internal_error("list users: query failed", e))?;

    let dtos: Vec<UserDto> = users.iter().map(UserDto::from).collect();
    let total_pages = (total + page_size - 1) / page_size;

    Ok(Json(serde_json::json!({
        "users": dtos,
        "totalCount": total,
        "page": page,
        "pageSize": page_size,
        "totalPages": total_pages,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub is_active: bool,
}

async fn set_user_status(
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin() {
        return Err(api_error(StatusCode::FORBIDDEN, "Admin access required"));
    }

    // Деактивация сразу отзывает refresh token
    let result = sqlx::query(
        "UPDATE users SET
             is_active = $2,
             refresh_token = CASE WHEN $2 THEN refresh_token ELSE NULL END,
             refresh_token_expires_at =
                 CASE WHEN $2 THEN refresh_token_expires_at ELSE NULL END,
             updated_at = NOW()
         WHERE id = $1",
    )
    .bind(target_id)
    .bind(req.is_active)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("set user status: update failed", e))?;

    if result.rows_affected() == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "User not found"));
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "User status updated" })),
    ))
}
