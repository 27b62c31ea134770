use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub capacity: i32,
    pub description: Option<String>,
    pub amenities: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueDto {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub capacity: i32,
    pub description: Option<String>,
    pub amenities: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

impl From<&Venue> for VenueDto {
    fn from(v: &Venue) -> Self {
        VenueDto {
            id: v.id,
            name: v.name.clone(),
            address: v.address.clone(),
            city: v.city.clone(),
            state: v.state.clone(),
            country: v.country.clone(),
            capacity: v.capacity,
            description: v.description.clone(),
            amenities: v.amenities.clone(),
            latitude: v.latitude,
            longitude: v.longitude,
            image_url: v.image_url.clone(),
            contact_phone: v.contact_phone.clone(),
            contact_email: v.contact_email.clone(),
        }
    }
}
