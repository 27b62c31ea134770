use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::controllers::{api_error, internal_error, ApiError};
use crate::middleware::AuthUser;
use crate::models::user::UserRole;
use crate::models::venue::{Venue, VenueDto};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues", get(list_venues).post(create_venue))
        .route("/venues/{id}", get(get_venue))
}

async fn list_venues(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let venues: Vec<Venue> =
        sqlx::query_as("SELECT * FROM venues WHERE is_active ORDER BY name")
            .fetch_all(&state.db.pool)
            .await
            .map_err(|e| internal_error("list venues: query failed", e))?;

    let dtos: Vec<VenueDto> = venues.iter().map(VenueDto::from).collect();
    Ok(Json(dtos))
}

async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let venue: Option<Venue> =
        sqlx::query_as("SELECT * FROM venues WHERE id = $1 AND is_active")
            .bind(venue_id)
            .fetch_optional(&state.db.pool)
            .await
            .map_err(|e| internal_error("get venue: query failed", e))?;

    match venue {
        Some(venue) => Ok(Json(VenueDto::from(&venue))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Venue not found")),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVenueRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    #[validate(range(min = 0, max = 1_000_000))]
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub amenities: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

async fn create_venue(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateVenueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !matches!(user.role, UserRole::Admin | UserRole::EventOrganizer) {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Only administrators and organizers can create venues",
        ));
    }
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let venue: Venue = sqlx::query_as(
        "INSERT INTO venues
             (name, address, city, state, zip_code, country, capacity,
              description, amenities, latitude, longitude, image_url,
              contact_phone, contact_email)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.address)
    .bind(req.city.as_deref().unwrap_or(""))
    .bind(req.state.as_deref().unwrap_or(""))
    .bind(req.zip_code.as_deref().unwrap_or(""))
    .bind(req.country.as_deref().unwrap_or(""))
    .bind(req.capacity.unwrap_or(0))
    .bind(&req.description)
    .bind(&req.amenities)
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(&req.image_url)
    .bind(&req.contact_phone)
    .bind(&req.contact_email)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| internal_error("create venue: insert failed", e))?;

    Ok((StatusCode::CREATED, Json(VenueDto::from(&venue))))
}
