use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::FromRow;
use std::sync::Arc;
use validator::Validate;

use crate::controllers::{api_error, internal_error, ApiError};
use crate::middleware::AuthUser;
use crate::models::category::CategoryDto;
use crate::models::Category;
use crate::models::EventStatus;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", get(get_category))
}

// Категория сразу со счётчиком опубликованных событий
#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    icon_url: Option<String>,
    color: Option<String>,
    event_count: i64,
}

impl From<CategoryRow> for CategoryDto {
    fn from(row: CategoryRow) -> Self {
        CategoryDto {
            id: row.id,
            name: row.name,
            description: row.description,
            icon_url: row.icon_url,
            color: row.color,
            event_count: row.event_count,
        }
    }
}

const CATEGORY_SELECT: &str = "\
    SELECT c.id, c.name, c.description, c.icon_url, c.color,
           (SELECT COUNT(*) FROM events e
            WHERE e.category_id = c.id AND e.status = $1) AS event_count
    FROM categories c";

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sql = format!("{} WHERE c.is_active ORDER BY c.name", CATEGORY_SELECT);
    let rows: Vec<CategoryRow> = sqlx::query_as(&sql)
        .bind(EventStatus::Published)
        .fetch_all(&state.db.pool)
        .await
        .map_err(|e| internal_error("list categories: query failed", e))?;

    let dtos: Vec<CategoryDto> = rows.into_iter().map(CategoryDto::from).collect();
    Ok(Json(dtos))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let sql = format!("{} WHERE c.id = $2 AND c.is_active", CATEGORY_SELECT);
    let row: Option<CategoryRow> = sqlx::query_as(&sql)
        .bind(EventStatus::Published)
        .bind(category_id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| internal_error("get category: query failed", e))?;

    match row {
        Some(row) => Ok(Json(CategoryDto::from(row))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Category not found")),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub color: Option<String>,
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin() {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Only administrators can create categories",
        ));
    }
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let category: Category = sqlx::query_as(
        "INSERT INTO categories (name, description, icon_url, color)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.icon_url)
    .bind(&req.color)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| internal_error("create category: insert failed", e))?;

    let dto = CategoryDto {
        id: category.id,
        name: category.name,
        description: category.description,
        icon_url: category.icon_url,
        color: category.color,
        event_count: 0,
    };
    Ok((StatusCode::CREATED, Json(dto)))
}
