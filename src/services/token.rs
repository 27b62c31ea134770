use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::user::{User, UserDto, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub role: UserRole,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
}

// Ответ на успешную аутентификацию (register/login/google/refresh)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

pub fn generate_tokens(
    user: &User,
    jwt: &JwtConfig,
) -> Result<AuthResponse, jsonwebtoken::errors::Error> {
    let expires_at = Utc::now() + Duration::minutes(jwt.expiry_minutes);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        given_name: user.first_name.clone(),
        family_name: user.last_name.clone(),
        role: user.role,
        iss: jwt.issuer.clone(),
        aud: jwt.audience.clone(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )?;

    Ok(AuthResponse {
        token,
        refresh_token: generate_refresh_token(),
        expires_at,
        user: UserDto::from(user),
    })
}

// 32 байта энтропии в url-safe base64
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn decode_access_token(
    token: &str,
    jwt: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&jwt.issuer]);
    validation.set_audience(&[&jwt.audience]);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

// Для refresh: подпись проверяется, истёкший exp допустим
pub fn decode_expired_token(
    token: &str,
    jwt: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&jwt.issuer]);
    validation.set_audience(&[&jwt.audience]);
    validation.validate_exp = false;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            issuer: "eventsmart".to_string(),
            audience: "eventsmart-web".to_string(),
            expiry_minutes: 60,
            refresh_expiry_days: 7,
        }
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            password_hash: None,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: UserRole::EventOrganizer,
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

    #[test]
    fn token_roundtrip_preserves_claims() {
        let cfg = jwt_config();
        let user = sample_user();
        let tokens = generate_tokens(&user, &cfg).unwrap();

        let claims = decode_access_token(&tokens.token, &cfg).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, UserRole::EventOrganizer);
        assert_eq!(claims.iss, cfg.issuer);
    }

    #[test]
    fn expired_token_rejected_but_refresh_decode_accepts() {
        let mut cfg = jwt_config();
        cfg.expiry_minutes = -10;
        let user = sample_user();
        let tokens = generate_tokens(&user, &cfg).unwrap();

        assert!(decode_access_token(&tokens.token, &cfg).is_err());
        let claims = decode_expired_token(&tokens.token, &cfg).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[test]
    fn wrong_issuer_rejected() {
        let cfg = jwt_config();
        let user = sample_user();
        let tokens = generate_tokens(&user, &cfg).unwrap();

        let mut other = jwt_config();
        other.issuer = "someone-else".to_string();
        assert!(decode_access_token(&tokens.token, &other).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let cfg = jwt_config();
        let tokens = generate_tokens(&sample_user(), &cfg).unwrap();

        let mut other = jwt_config();
        other.secret = "different-secret".to_string();
        assert!(decode_access_token(&tokens.token, &other).is_err());
        assert!(decode_expired_token(&tokens.token, &other).is_err());
    }

    #[test]
    fn refresh_tokens_are_unique_and_url_safe() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        // 32 байта -> 43 символа base64 без паддинга
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
