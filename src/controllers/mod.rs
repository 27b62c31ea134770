pub mod admin;
pub mod auth;
pub mod categories;
pub mod events;
pub mod user;
pub mod venues;

use axum::{http::StatusCode, Json, Router};
use serde_json::json;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/user", user::routes())
        .nest("/admin", admin::routes())
        .merge(events::routes())
        .merge(venues::routes())
        .merge(categories::routes())
}

/* ---------- error helpers ---------- */

pub(crate) type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "message": message })))
}

// Любая неожиданная ошибка: логируем подробности, наружу отдаём 500
pub(crate) fn internal_error<E: std::fmt::Debug>(context: &str, e: E) -> ApiError {
    tracing::error!("{}: {:?}", context, e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
