use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Роли хранятся в БД как int (как в исходной схеме)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum UserRole {
    Admin = 0,
    EventOrganizer = 1,
    Vendor = 2,
    Attendee = 3,
}

impl UserRole {
    // Разбор строки из admin-запроса смены роли
    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "Admin" => Some(UserRole::Admin),
            "EventOrganizer" => Some(UserRole::EventOrganizer),
            "Vendor" => Some(UserRole::Vendor),
            "Attendee" => Some(UserRole::Attendee),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::EventOrganizer => "EventOrganizer",
            UserRole::Vendor => "Vendor",
            UserRole::Attendee => "Attendee",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    // NULL для аккаунтов, созданных через Google
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub profile_image_url: Option<String>,
    pub is_active: bool,
    pub google_id: Option<String>,
    pub is_google_auth: bool,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    // Найти пользователя по email
    pub async fn find_by_email(
        email: &str,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&db.pool)
            .await
    }

    pub async fn find_by_id(
        id: Uuid,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&db.pool)
            .await
    }

    pub fn verify_password(&self, password: &str) -> bool {
        match &self.password_hash {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            None => false,
        }
    }

    pub fn refresh_token_valid(&self, refresh_token: &str) -> bool {
        self.refresh_token.as_deref() == Some(refresh_token)
            && self.refresh_token_expires_at.is_some_and(|t| t > Utc::now())
    }
}

// Публичное представление пользователя в ответах API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub profile_image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub is_google_auth: bool,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        UserDto {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            profile_image_url: user.profile_image_url.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
            is_google_auth: user.is_google_auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_roundtrip() {
        for role in [
            UserRole::Admin,
            UserRole::EventOrganizer,
            UserRole::Vendor,
            UserRole::Attendee,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("Superuser"), None);
    }

    #[test]
    fn refresh_token_expiry_checked() {
        let mut user = sample_user();
        user.refresh_token = Some("abc".to_string());
        user.refresh_token_expires_at = Some(Utc::now() + chrono::Duration::days(1));
        assert!(user.refresh_token_valid("abc"));
        assert!(!user.refresh_token_valid("other"));

        user.refresh_token_expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
        assert!(!user.refresh_token_valid("abc"));
    }

    #[test]
    fn google_account_has_no_password() {
        let user = sample_user();
        assert!(!user.verify_password("anything"));
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            password_hash: None,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: UserRole::Attendee,
            profile_image_url: None,
            is_active: true,
            google_id: None,
            is_google_auth: false,
            refresh_token: None,
            refresh_token_expires_at: None,
            password_reset_token: None,
            password_reset_expires_at: None,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
