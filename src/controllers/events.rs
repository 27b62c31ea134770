use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{api_error, internal_error, ApiError};
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::models::{Event, EventStatus};
use crate::services::events as event_service;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/my-events", get(my_events))
        .route("/events/recommendations", get(recommendations))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route(
            "/events/{id}/register",
            post(register_for_event).delete(unregister_from_event),
        )
        .route("/events/{id}/checkin", post(check_in))
}

// Общий SELECT: событие + организатор + категория + площадка + рейтинг
// + регистрация смотрящего ($1, NULL для анонима)
const EVENT_SELECT: &str = "\
    SELECT e.id, e.title, e.description, e.start_date, e.end_date, e.status,
           e.ticket_price, e.max_attendees, e.current_attendees, e.image_url,
           e.requirements, e.is_public, e.allow_waitlist, e.created_at,
           u.id AS organizer_id,
           u.first_name AS organizer_first_name,
           u.last_name AS organizer_last_name,
           c.id AS category_id, c.name AS category_name,
           c.icon_url AS category_icon_url, c.color AS category_color,
           v.id AS venue_id, v.name AS venue_name,
           v.address AS venue_address, v.city AS venue_city,
           (SELECT AVG(r.rating)::FLOAT8 FROM reviews r WHERE r.event_id = e.id)
               AS average_rating,
           (SELECT COUNT(*) FROM reviews r WHERE r.event_id = e.id)
               AS review_count,
           reg.id AS registration_id,
           reg.is_waitlisted AS registration_waitlisted
    FROM events e
    JOIN users u ON u.id = e.organizer_id
    JOIN categories c ON c.id = e.category_id
    LEFT JOIN venues v ON v.id = e.venue_id
    LEFT JOIN event_registrations reg
        ON reg.event_id = e.id AND reg.user_id = $1";

#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: EventStatus,
    ticket_price: Option<f64>,
    max_attendees: i32,
    current_attendees: i32,
    image_url: Option<String>,
    requirements: Option<String>,
    is_public: bool,
    allow_waitlist: bool,
    created_at: DateTime<Utc>,
    organizer_id: Uuid,
    organizer_first_name: String,
    organizer_last_name: String,
    category_id: i64,
    category_name: String,
    category_icon_url: Option<String>,
    category_color: Option<String>,
    venue_id: Option<i64>,
    venue_name: Option<String>,
    venue_address: Option<String>,
    venue_city: Option<String>,
    average_rating: Option<f64>,
    review_count: i64,
    registration_id: Option<i64>,
    registration_waitlisted: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerInfo {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub id: i64,
    pub name: String,
    pub icon_url: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueInfo {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: EventStatus,
    pub ticket_price: Option<f64>,
    pub max_attendees: i32,
    pub current_attendees: i32,
    pub image_url: Option<String>,
    pub requirements: Option<String>,
    pub is_public: bool,
    pub allow_waitlist: bool,
    pub created_at: DateTime<Utc>,
    pub organizer: OrganizerInfo,
    pub category: CategoryInfo,
    pub venue: Option<VenueInfo>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub is_registered: bool,
    pub is_waitlisted: bool,
}

impl From<EventRow> for EventResponse {
    fn from(row: EventRow) -> Self {
        let venue = match (row.venue_id, row.venue_name) {
            (Some(id), Some(name)) => Some(VenueInfo {
                id,
                name,
                address: row.venue_address.unwrap_or_default(),
                city: row.venue_city.unwrap_or_default(),
            }),
            _ => None,
        };

        EventResponse {
            id: row.id,
            title: row.title,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status,
            ticket_price: row.ticket_price,
            max_attendees: row.max_attendees,
            current_attendees: row.current_attendees,
            image_url: row.image_url,
            requirements: row.requirements,
            is_public: row.is_public,
            allow_waitlist: row.allow_waitlist,
            created_at: row.created_at,
            organizer: OrganizerInfo {
                id: row.organizer_id,
                name: format!("{} {}", row.organizer_first_name, row.organizer_last_name),
            },
            category: CategoryInfo {
                id: row.category_id,
                name: row.category_name,
                icon_url: row.category_icon_url,
                color: row.category_color,
            },
            venue,
            average_rating: row.average_rating,
            review_count: row.review_count,
            is_registered: row.registration_id.is_some(),
            is_waitlisted: row.registration_waitlisted.unwrap_or(false),
        }
    }
}

async fn fetch_event(
    state: &AppState,
    event_id: i64,
    viewer: Option<Uuid>,
) -> Result<Option<EventResponse>, sqlx::Error> {
    let sql = format!("{} WHERE e.id = $2", EVENT_SELECT);
    let row: Option<EventRow> = sqlx::query_as(&sql)
        .bind(viewer)
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await?;
    Ok(row.map(EventResponse::from))
}

/* ---------- listing ---------- */

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub search: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEventsQuery>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Result<Response, ApiError> {
    let viewer = user.as_ref().map(|u| u.user_id);
    let unfiltered = params.search.is_none() && params.category_id.is_none();

    // Кешируем только «голый» публичный список: у авторизованных
    // в ответе персональные флаги регистрации
    if unfiltered && viewer.is_none() {
        if let Some(cached) = state.cache.get_cached_events().await {
            return Response::builder()
                .header("Content-Type", "application/json")
                .header("X-Cache", "HIT")
                .body(Body::from(cached))
                .map_err(|e| internal_error("list events: response build failed", e));
        }
    }

    let mut sql = format!("{} WHERE e.status = $2 AND e.is_public", EVENT_SELECT);
    let mut bind_idx = 3;
    if params.search.is_some() {
        sql.push_str(&format!(
            " AND (e.title ILIKE ${0} OR e.description ILIKE ${0})",
            bind_idx
        ));
        bind_idx += 1;
    }
    if params.category_id.is_some() {
        sql.push_str(&format!(" AND e.category_id = ${}", bind_idx));
    }
    sql.push_str(" ORDER BY e.start_date");

    let mut query = sqlx::query_as::<_, EventRow>(&sql)
        .bind(viewer)
        .bind(EventStatus::Published);
    if let Some(search) = &params.search {
        query = query.bind(format!("%{}%", search));
    }
    if let Some(category_id) = params.category_id {
        query = query.bind(category_id);
    }

    let rows = query
        .fetch_all(&state.db.pool)
        .await
        .map_err(|e| internal_error("list events: query failed", e))?;
    let events: Vec<EventResponse> = rows.into_iter().map(EventResponse::from).collect();

    if unfiltered && viewer.is_none() {
        if let Ok(json) = serde_json::to_string(&events) {
            state.cache.cache_events(&json).await;
            return Response::builder()
                .header("Content-Type", "application/json")
                .header("X-Cache", "MISS")
                .body(Body::from(json))
                .map_err(|e| internal_error("list events: response build failed", e));
        }
    }

    Ok(Json(events).into_response())
}

/* ---------- single event ---------- */

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let event = fetch_event(&state, event_id, user.as_ref().map(|u| u.user_id))
        .await
        .map_err(|e| internal_error("get event: query failed", e))?;

    match event {
        Some(event) => Ok(Json(event)),
        None => Err(api_error(StatusCode::NOT_FOUND, "Event not found")),
    }
}

/* ---------- create / update / delete ---------- */

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub category_id: i64,
    pub venue_id: Option<i64>,
    pub ticket_price: Option<f64>,
    #[validate(range(min = 1, max = 100_000))]
    pub max_attendees: i32,
    pub image_url: Option<String>,
    pub requirements: Option<String>,
    pub is_public: Option<bool>,
    pub allow_waitlist: Option<bool>,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;
    if req.end_date <= req.start_date {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "End date must be after start date",
        ));
    }

    // Новое событие всегда черновик, публикация отдельным апдейтом
    let event_id: i64 = sqlx::query_scalar(
        "INSERT INTO events
             (title, description, start_date, end_date, organizer_id, venue_id,
              category_id, ticket_price, max_attendees, status, image_url,
              requirements, is_public, allow_waitlist)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING id",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(user.user_id)
    .bind(req.venue_id)
    .bind(req.category_id)
    .bind(req.ticket_price)
    .bind(req.max_attendees)
    .bind(EventStatus::Draft)
    .bind(&req.image_url)
    .bind(&req.requirements)
    .bind(req.is_public.unwrap_or(true))
    .bind(req.allow_waitlist.unwrap_or(false))
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| internal_error("create event: insert failed", e))?;

    state.cache.invalidate_events().await;

    let event = fetch_event(&state, event_id, Some(user.user_id))
        .await
        .map_err(|e| internal_error("create event: fetch failed", e))?
        .ok_or_else(|| {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?;

    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    pub venue_id: Option<i64>,
    pub ticket_price: Option<f64>,
    #[validate(range(min = 1, max = 100_000))]
    pub max_attendees: Option<i32>,
    pub status: Option<EventStatus>,
    pub image_url: Option<String>,
    pub requirements: Option<String>,
    pub is_public: Option<bool>,
    pub allow_waitlist: Option<bool>,
}

async fn require_organizer(
    state: &AppState,
    event_id: i64,
    user: &AuthUser,
) -> Result<Event, ApiError> {
    let event: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| internal_error("event lookup failed", e))?;

    match event {
        None => Err(api_error(StatusCode::NOT_FOUND, "Event not found")),
        Some(event) if event.organizer_id == user.user_id || user.is_admin() => Ok(event),
        Some(_) => Err(api_error(
            StatusCode::FORBIDDEN,
            "Only the event organizer can modify this event",
        )),
    }
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    user: AuthUser,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.to_string()))?;
    require_organizer(&state, event_id, &user).await?;

    // Частичный апдейт: NULL-бинды оставляют текущее значение
    sqlx::query(
        "UPDATE events SET
             title = COALESCE($2, title),
             description = COALESCE($3, description),
             start_date = COALESCE($4, start_date),
             end_date = COALESCE($5, end_date),
             category_id = COALESCE($6, category_id),
             venue_id = COALESCE($7, venue_id),
             ticket_price = COALESCE($8, ticket_price),
             max_attendees = COALESCE($9, max_attendees),
             status = COALESCE($10, status),
             image_url = COALESCE($11, image_url),
             requirements = COALESCE($12, requirements),
             is_public = COALESCE($13, is_public),
             allow_waitlist = COALESCE($14, allow_waitlist),
             updated_at = NOW()
         WHERE id = $1",
    )
    .bind(event_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.category_id)
    .bind(req.venue_id)
    .bind(req.ticket_price)
    .bind(req.max_attendees)
    .bind(req.status)
    .bind(&req.image_url)
    .bind(&req.requirements)
    .bind(req.is_public)
    .bind(req.allow_waitlist)
    .execute(&state.db.pool)
    .await
    .map_err(|e| internal_error("update event: update failed", e))?;

    state.cache.invalidate_events().await;

    let event = fetch_event(&state, event_id, Some(user.user_id))
        .await
        .map_err(|e| internal_error("update event: fetch failed", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Event not found"))?;

    Ok(Json(event))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state, event_id, &user).await?;

    // Регистрации и отзывы уходят каскадом
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| internal_error("delete event: delete failed", e))?;

    state.cache.invalidate_events().await;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Event deleted successfully" })),
    ))
}

/* ---------- my events / recommendations ---------- */

#[derive(Debug, Deserialize)]
pub struct MyEventsQuery {
    #[serde(rename = "asOrganizer")]
    pub as_organizer: Option<bool>,
}

async fn my_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MyEventsQuery>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let sql = if params.as_organizer.unwrap_or(false) {
        // Организатору показываем и черновики
        format!(
            "{} WHERE e.organizer_id = $1 ORDER BY e.start_date DESC",
            EVENT_SELECT
        )
    } else {
        format!(
            "{} WHERE reg.id IS NOT NULL ORDER BY e.start_date",
            EVENT_SELECT
        )
    };

    let rows: Vec<EventRow> = sqlx::query_as(&sql)
        .bind(user.user_id)
        .fetch_all(&state.db.pool)
        .await
        .map_err(|e| internal_error("my events: query failed", e))?;

    let events: Vec<EventResponse> = rows.into_iter().map(EventResponse::from).collect();
    Ok(Json(events))
}

async fn recommendations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let categories: Vec<i64> = sqlx::query_scalar(
        "SELECT DISTINCT e.category_id
         FROM event_registrations r
         JOIN events e ON e.id = r.event_id
         WHERE r.user_id = $1",
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| internal_error("recommendations: history query failed", e))?;

    let rows: Vec<EventRow> = if categories.is_empty() {
        // Без истории - просто самые популярные предстоящие события
        let sql = format!(
            "{} WHERE e.status = $2 AND e.is_public AND e.start_date > NOW()
             ORDER BY e.current_attendees DESC LIMIT 10",
            EVENT_SELECT
        );
        sqlx::query_as(&sql)
            .bind(user.user_id)
            .bind(EventStatus::Published)
            .fetch_all(&state.db.pool)
            .await
    } else {
        let sql = format!(
            "{} WHERE e.status = $2 AND e.is_public AND e.start_date > NOW()
             AND e.category_id = ANY($3) AND reg.id IS NULL
             ORDER BY e.start_date LIMIT 10",
            EVENT_SELECT
        );
        sqlx::query_as(&sql)
            .bind(user.user_id)
            .bind(EventStatus::Published)
            .bind(&categories)
            .fetch_all(&state.db.pool)
            .await
    }
    .map_err(|e| internal_error("recommendations: query failed", e))?;

    let events: Vec<EventResponse> = rows.into_iter().map(EventResponse::from).collect();
    Ok(Json(events))
}

/* ---------- registration ---------- */

async fn register_for_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let registered = event_service::register_for_event(&state.db, event_id, user.user_id)
        .await
        .map_err(|e| internal_error("register for event failed", e))?;

    if !registered {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Unable to register for this event",
        ));
    }

    state.cache.invalidate_events().await;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Successfully registered for event" })),
    ))
}

async fn unregister_from_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let removed = event_service::unregister_from_event(&state.db, event_id, user.user_id)
        .await
        .map_err(|e| internal_error("unregister from event failed", e))?;

    if !removed {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "No registration found for this event",
        ));
    }

    state.cache.invalidate_events().await;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Successfully unregistered from event" })),
    ))
}

async fn check_in(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let checked_in = event_service::check_in(&state.db, event_id, user.user_id)
        .await
        .map_err(|e| internal_error("check-in failed", e))?;

    if !checked_in {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "No confirmed registration found for this event",
        ));
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Checked in successfully" })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> EventRow {
        EventRow {
            id: 7,
            title: "Rust Meetup".to_string(),
            description: "Monthly meetup".to_string(),
            start_date: Utc::now(),
            end_date: Utc::now(),
            status: EventStatus::Published,
            ticket_price: None,
            max_attendees: 50,
            current_attendees: 50,
            image_url: None,
            requirements: None,
            is_public: true,
            allow_waitlist: true,
            created_at: Utc::now(),
            organizer_id: Uuid::new_v4(),
            organizer_first_name: "Jane".to_string(),
            organizer_last_name: "Doe".to_string(),
            category_id: 1,
            category_name: "Technology".to_string(),
            category_icon_url: None,
            category_color: None,
            venue_id: None,
            venue_name: None,
            venue_address: None,
            venue_city: None,
            average_rating: Some(4.5),
            review_count: 12,
            registration_id: Some(3),
            registration_waitlisted: Some(true),
        }
    }

    #[test]
    fn response_carries_registration_flags() {
        let response = EventResponse::from(sample_row());
        assert!(response.is_registered);
        assert!(response.is_waitlisted);
        assert_eq!(response.organizer.name, "Jane Doe");
        assert!(response.venue.is_none());

        let mut row = sample_row();
        row.registration_id = None;
        row.registration_waitlisted = None;
        let response = EventResponse::from(row);
        assert!(!response.is_registered);
        assert!(!response.is_waitlisted);
    }

    #[test]
    fn response_serializes_camel_case() {
        let json = serde_json::to_value(EventResponse::from(sample_row())).unwrap();
        assert!(json.get("startDate").is_some());
        assert!(json.get("maxAttendees").is_some());
        assert!(json.get("isRegistered").is_some());
        assert_eq!(json["status"], "Published");
        assert_eq!(json["reviewCount"], 12);
    }

    #[test]
    fn create_request_validation_bounds() {
        let valid = CreateEventRequest {
            title: "Conf".to_string(),
            description: "A conference".to_string(),
            start_date: Utc::now(),
            end_date: Utc::now(),
            category_id: 1,
            venue_id: None,
            ticket_price: None,
            max_attendees: 100,
            image_url: None,
            requirements: None,
            is_public: None,
            allow_waitlist: None,
        };
        assert!(valid.validate().is_ok());

        let empty_title = CreateEventRequest { title: String::new(), ..clone_request(&valid) };
        assert!(empty_title.validate().is_err());

        let overlong_title =
            CreateEventRequest { title: "x".repeat(201), ..clone_request(&valid) };
        assert!(overlong_title.validate().is_err());

        let zero_capacity = CreateEventRequest { max_attendees: 0, ..clone_request(&valid) };
        assert!(zero_capacity.validate().is_err());
    }

    fn clone_request(r: &CreateEventRequest) -> CreateEventRequest {
        CreateEventRequest {
            title: r.title.clone(),
            description: r.description.clone(),
            start_date: r.start_date,
            end_date: r.end_date,
            category_id: r.category_id,
            venue_id: r.venue_id,
            ticket_price: r.ticket_price,
            max_attendees: r.max_attendees,
            image_url: r.image_url.clone(),
            requirements: r.requirements.clone(),
            is_public: r.is_public,
            allow_waitlist: r.allow_waitlist,
        }
    }
}
