use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch},
    Json, Router,
};
use chrono::{Duration, Months, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::controllers::{api_error, internal_error, ApiError};
use crate::middleware::AuthUser;
use crate::models::user::{User, UserDto, UserRole};
use crate::models::EventStatus;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/stats", get(user_stats))
        .route("/users/{id}/status", patch(update_user_status))
        .route("/users/{id}/role", patch(update_user_role))
        .route("/users/{id}", delete(delete_user))
        .route("/analytics", get(analytics))
        .route("/dashboard-stats", get(dashboard_stats))
}

fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(api_error(StatusCode::FORBIDDEN, "Admin access required"))
    }
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;

    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&state.db.pool)
        .await
        .map_err(|e| internal_error("admin list users: query failed", e))?;

    let dtos: Vec<UserDto> = users.iter().map(UserDto::from).collect();
    Ok(Json(dtos))
}

#[derive(Debug, FromRow)]
struct RoleCount {
    role: UserRole,
    count: i64,
}

async fn user_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;

    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("user stats: count failed", e))?;
    let active_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("user stats: active count failed", e))?;
    let new_this_month: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= $1")
            .bind(Utc::now() - Duration::days(30))
            .fetch_one(&state.db.pool)
            .await
            .map_err(|e| internal_error("user stats: new-users count failed", e))?;

    let by_role: Vec<RoleCount> =
        sqlx::query_as("SELECT role, COUNT(*) AS count FROM users GROUP BY role")
            .fetch_all(&state.db.pool)
            .await
            .map_err(|e| internal_error("user stats: role breakdown failed", e))?;

    let users_by_role: Vec<serde_json::Value> = by_role
        .iter()
        .map(|r| json!({ "role": r.role.as_str(), "count": r.count }))
        .collect();

    Ok(Json(json!({
        "totalUsers": total_users,
        "activeUsers": active_users,
        "inactiveUsers": total_users - active_users,
        "newUsersThisMonth": new_this_month,
        "usersByRole": users_by_role,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;

    let result = sqlx::query(
        "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(target_id)
    .bind(req.is_active)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("update user status failed", e))?;

    if result.rows_affected() == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "User not found"));
    }
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;

    let Some(role) = UserRole::parse(&req.role) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid role"));
    };

    let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
        .bind(target_id)
        .bind(role)
        .execute(&state.db.pool)
        .await
        .map_err(|e| internal_error("update user role failed", e))?;

    if result.rows_affected() == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "User not found"));
    }
    Ok(StatusCode::OK)
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;

    // События, регистрации и попытки входа уходят каскадом
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(target_id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| internal_error("delete user failed", e))?;

    if result.rows_affected() == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "User not found"));
    }
    Ok(StatusCode::OK)
}

/* ---------- analytics ---------- */

#[derive(Debug, FromRow)]
struct CategoryPopularity {
    name: String,
    count: i64,
}

async fn analytics(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;

    let total_events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("analytics: event count failed", e))?;
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("analytics: user count failed", e))?;
    let total_registrations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations")
            .fetch_one(&state.db.pool)
            .await
            .map_err(|e| internal_error("analytics: registration count failed", e))?;
    let active_events: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM events WHERE status = $1 AND end_date > NOW()",
    )
    .bind(EventStatus::Published)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| internal_error("analytics: active event count failed", e))?;
    let new_users_this_month: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= $1")
            .bind(Utc::now() - Duration::days(30))
            .fetch_one(&state.db.pool)
            .await
            .map_err(|e| internal_error("analytics: new-users count failed", e))?;

    // Оценка выручки: цена билета * число регистраций
    let revenue: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(e.ticket_price * sub.cnt), 0)::FLOAT8
         FROM events e
         JOIN (SELECT event_id, COUNT(*) AS cnt
               FROM event_registrations GROUP BY event_id) sub
             ON sub.event_id = e.id
         WHERE e.ticket_price IS NOT NULL",
    )
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| internal_error("analytics: revenue query failed", e))?;

    let popular: Vec<CategoryPopularity> = sqlx::query_as(
        "SELECT c.name, COUNT(e.id) AS count
         FROM categories c
         LEFT JOIN events e ON e.category_id = c.id
         GROUP BY c.name
         ORDER BY count DESC
         LIMIT 5",
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| internal_error("analytics: category query failed", e))?;

    let popular_categories: Vec<serde_json::Value> = popular
        .iter()
        .map(|c| {
            let percentage = if total_events > 0 {
                c.count as f64 * 100.0 / total_events as f64
            } else {
                0.0
            };
            json!({ "name": c.name, "count": c.count, "percentage": percentage })
        })
        .collect();

    // Лента активности и помесячные ряды пока мок, как в дашборде фронта
    let now = Utc::now();
    let recent_activity = json!([
        { "type": "registration", "description": "New user registered",
          "timestamp": now - Duration::minutes(30) },
        { "type": "event", "description": "New event created",
          "timestamp": now - Duration::hours(1) },
        { "type": "payment", "description": "Payment received",
          "timestamp": now - Duration::hours(2) },
    ]);

    let mut rng = rand::thread_rng();
    let monthly_data: Vec<serde_json::Value> = (0u32..6)
        .rev()
        .filter_map(|i| now.checked_sub_months(Months::new(i)))
        .map(|month| {
            json!({
                "month": month.format("%B").to_string(),
                "events": rng.gen_range(80..120),
                "registrations": rng.gen_range(1000..1600),
                "revenue": rng.gen_range(15_000..25_000),
            })
        })
        .collect();

    Ok(Json(json!({
        "totalEvents": total_events,
        "totalUsers": total_users,
        "totalRegistrations": total_registrations,
        "revenue": revenue,
        "activeEvents": active_events,
        "newUsersThisMonth": new_users_this_month,
        "popularCategories": popular_categories,
        "recentActivity": recent_activity,
        "monthlyData": monthly_data,
    })))
}

async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;

    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("dashboard stats: user count failed", e))?;
    let total_events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("dashboard stats: event count failed", e))?;
    let total_venues: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM venues")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("dashboard stats: venue count failed", e))?;
    let total_categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| internal_error("dashboard stats: category count failed", e))?;

    Ok(Json(json!({
        "totalUsers": total_users,
        "totalEvents": total_events,
        "totalVenues": total_venues,
        "totalCategories": total_categories,
    })))
}
