use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum EventStatus {
    Draft = 0,
    Published = 1,
    InProgress = 2,
    Completed = 3,
    Cancelled = 4,
}

#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub organizer_id: Uuid,
    pub venue_id: Option<i64>,
    pub category_id: i64,
    pub ticket_price: Option<f64>,
    pub max_attendees: i32,
    pub current_attendees: i32,
    pub status: EventStatus,
    pub image_url: Option<String>,
    pub requirements: Option<String>,
    pub is_public: bool,
    pub allow_waitlist: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
