use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{api_error, internal_error, ApiError};
use crate::middleware::AuthUser;
use crate::models::user::{User, UserRole};
use crate::services::token;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google-auth", post(google_auth))
        .route("/refresh", post(refresh_token))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/logout", post(logout))
}

/* ---------- helpers ---------- */

// IP берём из заголовков прокси, как исходный бекенд
fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            return first.trim().to_string();
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    "unknown".to_string()
}

// Аудит входов; сбой записи никогда не ломает аутентификацию
async fn log_login_attempt(
    state: &AppState,
    user_id: Option<Uuid>,
    headers: &HeaderMap,
    is_successful: bool,
    failure_reason: Option<&str>,
) {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let result = sqlx::query(
        "INSERT INTO user_login_attempts
             (user_id, ip_address, user_agent, is_successful, failure_reason)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(client_ip(headers))
    .bind(user_agent)
    .bind(is_successful)
    .bind(failure_reason)
    .execute(&state.db.pool)
    .await;

    if let Err(e) = result {
        warn!("Failed to log login attempt: {:?}", e);
    }
}

async fn store_refresh_token(
    state: &AppState,
    user_id: Uuid,
    refresh_token: &str,
) -> Result<(), sqlx::Error> {
    let expires_at = Utc::now() + Duration::days(state.config.jwt.refresh_expiry_days);
    sqlx::query(
        "UPDATE users SET refresh_token = $2, refresh_token_expires_at = $3 WHERE id = $1",
    )
    .bind(user_id)
    .bind(refresh_token)
    .bind(expires_at)
    .execute(&state.db.pool)
    .await?;
    Ok(())
}

// Welcome email уходит в фоне; ошибка не мешает регистрации
fn send_welcome_email_background(state: &AppState, email: String, first_name: String) {
    let sender = state.email.clone();
    tokio::spawn(async move {
        if let Err(e) = sender.send_welcome_email(&email, &first_name).await {
            warn!("Failed to send welcome email to {}: {}", email, e);
        }
    });
}

/* ---------- register / login ---------- */

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub role: Option<UserRole>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let existing = User::find_by_email(&req.email, &state.db)
        .await
        .map_err(|e| internal_error("register: lookup failed", e))?;
    if existing.is_some() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "User with this email already exists",
        ));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| internal_error("register: password hashing failed", e))?;
    let role = req.role.unwrap_or(UserRole::Attendee);

    let user: User = sqlx::query_as(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, role)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(role)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| internal_error("register: insert failed", e))?;

    log_login_attempt(&state, Some(user.id), &headers, true, None).await;
    send_welcome_email_background(&state, user.email.clone(), user.first_name.clone());

    let tokens = token::generate_tokens(&user, &state.config.jwt)
        .map_err(|e| internal_error("register: token generation failed", e))?;
    store_refresh_token(&state, user.id, &tokens.refresh_token)
        .await
        .map_err(|e| internal_error("register: refresh token store failed", e))?;

    Ok((StatusCode::OK, Json(tokens)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_email(&req.email, &state.db)
        .await
        .map_err(|e| internal_error("login: lookup failed", e))?;

    let Some(user) = user else {
        log_login_attempt(&state, None, &headers, false, Some("User not found")).await;
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    };

    if !user.is_active {
        log_login_attempt(&state, Some(user.id), &headers, false, Some("Account deactivated"))
            .await;
        return Err(api_error(StatusCode::UNAUTHORIZED, "Account is deactivated"));
    }

    if !user.verify_password(&req.password) {
        log_login_attempt(&state, Some(user.id), &headers, false, Some("Invalid password")).await;
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    log_login_attempt(&state, Some(user.id), &headers, true, None).await;

    let tokens = token::generate_tokens(&user, &state.config.jwt)
        .map_err(|e| internal_error("login: token generation failed", e))?;
    let expires_at = Utc::now() + Duration::days(state.config.jwt.refresh_expiry_days);

    sqlx::query(
        "UPDATE users
         SET refresh_token = $2, refresh_token_expires_at = $3, last_login_at = NOW()
         WHERE id = $1",
    )
    .bind(user.id)
    .bind(&tokens.refresh_token)
    .bind(expires_at)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("login: refresh token store failed", e))?;

    Ok((StatusCode::OK, Json(tokens)))
}

/* ---------- google sign-in ---------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthRequest {
    pub google_token: String,
}

async fn google_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<GoogleAuthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state
        .google
        .validate_token(&req.google_token)
        .await
        .map_err(|e| {
            warn!("Google token validation failed: {}", e);
            api_error(StatusCode::UNAUTHORIZED, "Invalid Google token")
        })?;

    let existing = User::find_by_email(&payload.email, &state.db)
        .await
        .map_err(|e| internal_error("google-auth: lookup failed", e))?;

    let user: User = match existing {
        None => {
            // Первый вход через Google - создаём аккаунт без пароля
            let user: User = sqlx::query_as(
                "INSERT INTO users
                     (id, email, first_name, last_name, role, google_id, is_google_auth)
                 VALUES ($1, $2, $3, $4, $5, $6, TRUE)
                 RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(&payload.email)
            .bind(payload.given_name.as_deref().unwrap_or(""))
            .bind(payload.family_name.as_deref().unwrap_or(""))
            .bind(UserRole::Attendee)
            .bind(&payload.sub)
            .fetch_one(&state.db.pool)
            .await
            .map_err(|e| internal_error("google-auth: insert failed", e))?;

            send_welcome_email_background(&state, user.email.clone(), user.first_name.clone());
            user
        }
        Some(user) if !user.is_google_auth => {
            // Привязываем существующий email-аккаунт к Google
            sqlx::query_as(
                "UPDATE users SET google_id = $2, is_google_auth = TRUE WHERE id = $1
                 RETURNING *",
            )
            .bind(user.id)
            .bind(&payload.sub)
            .fetch_one(&state.db.pool)
            .await
            .map_err(|e| internal_error("google-auth: link failed", e))?
        }
        Some(user) => user,
    };

    if !user.is_active {
        log_login_attempt(&state, Some(user.id), &headers, false, Some("Account deactivated"))
            .await;
        return Err(api_error(StatusCode::UNAUTHORIZED, "Account is deactivated"));
    }

    log_login_attempt(&state, Some(user.id), &headers, true, None).await;

    let tokens = token::generate_tokens(&user, &state.config.jwt)
        .map_err(|e| internal_error("google-auth: token generation failed", e))?;
    store_refresh_token(&state, user.id, &tokens.refresh_token)
        .await
        .map_err(|e| internal_error("google-auth: refresh token store failed", e))?;

    Ok((StatusCode::OK, Json(tokens)))
}

/* ---------- token refresh ---------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub token: String,
    pub refresh_token: String,
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Подпись проверяется, истёкший exp допустим
    let claims = token::decode_expired_token(&req.token, &state.config.jwt)
        .map_err(|_| api_error(StatusCode::UNAUTHORIZED, "Invalid token"))?;

    let user = User::find_by_id(claims.sub, &state.db)
        .await
        .map_err(|e| internal_error("refresh: lookup failed", e))?;

    let Some(user) = user else {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid refresh token"));
    };
    if !user.refresh_token_valid(&req.refresh_token) {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid refresh token"));
    }

    let tokens = token::generate_tokens(&user, &state.config.jwt)
        .map_err(|e| internal_error("refresh: token generation failed", e))?;
    store_refresh_token(&state, user.id, &tokens.refresh_token)
        .await
        .map_err(|e| internal_error("refresh: refresh token store failed", e))?;

    Ok((StatusCode::OK, Json(tokens)))
}

/* ---------- password reset ---------- */

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Ответ одинаковый независимо от того, существует ли аккаунт
    let neutral = Json(serde_json::json!({
        "message": "If the email exists, a password reset link will be sent"
    }));

    let user = User::find_by_email(&req.email, &state.db)
        .await
        .map_err(|e| internal_error("forgot-password: lookup failed", e))?;
    let Some(user) = user else {
        return Ok((StatusCode::OK, neutral));
    };

    let reset_token = token::generate_refresh_token();
    let expires_at = Utc::now() + Duration::hours(1);

    sqlx::query(
        "UPDATE users SET password_reset_token = $2, password_reset_expires_at = $3 WHERE id = $1",
    )
    .bind(user.id)
    .bind(&reset_token)
    .bind(expires_at)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("forgot-password: token store failed", e))?;

    let reset_url = format!("{}/reset-password", state.config.app.frontend_url);
    state
        .email
        .send_password_reset_email(&user.email, &reset_token, &reset_url)
        .await
        .map_err(|e| internal_error("forgot-password: email failed", e))?;

    Ok((StatusCode::OK, neutral))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let user: Option<User> = sqlx::query_as(
        "SELECT * FROM users
         WHERE password_reset_token = $1 AND password_reset_expires_at > NOW()",
    )
    .bind(&req.token)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| internal_error("reset-password: lookup failed", e))?;

    let Some(user) = user else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid or expired reset token",
        ));
    };

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| internal_error("reset-password: hashing failed", e))?;

    // Новый пароль + инвалидация всех сессий
    sqlx::query(
        "UPDATE users
         SET password_hash = $2,
             password_reset_token = NULL,
             password_reset_expires_at = NULL,
             refresh_token = NULL,
             refresh_token_expires_at = NULL
         WHERE id = $1",
    )
    .bind(user.id)
    .bind(&password_hash)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("reset-password: update failed", e))?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Password reset successfully" })),
    ))
}

/* ---------- logout ---------- */

async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    sqlx::query(
        "UPDATE users SET refresh_token = NULL, refresh_token_expires_at = NULL WHERE id = $1",
    )
    .bind(user.user_id)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("logout: update failed", e))?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn register_request_validation() {
        let valid = RegisterRequest {
            email: "jane@example.com".to_string(),
            password: "correct-horse".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..clone_request(&valid)
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".to_string(),
            ..clone_request(&valid)
        };
        assert!(short_password.validate().is_err());

        let empty_name = RegisterRequest {
            first_name: String::new(),
            ..clone_request(&valid)
        };
        assert!(empty_name.validate().is_err());
    }

    fn clone_request(r: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            email: r.email.clone(),
            password: r.password.clone(),
            first_name: r.first_name.clone(),
            last_name: r.last_name.clone(),
            role: r.role,
        }
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers), "203.0.113.7");

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(&headers), "198.51.100.2");

        headers.remove("x-real-ip");
        assert_eq!(client_ip(&headers), "unknown");
    }
}
