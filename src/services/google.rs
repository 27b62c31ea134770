use serde::Deserialize;
use thiserror::Error;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Error)]
pub enum GoogleAuthError {
    #[error("invalid Google token")]
    InvalidToken,
    #[error("Google token audience mismatch")]
    AudienceMismatch,
    #[error("tokeninfo request failed: {0}")]
    Http(#[from] reqwest::Error),
}

// Подмножество полей ответа tokeninfo, которое нам нужно
#[derive(Debug, Clone, Deserialize)]
pub struct GooglePayload {
    pub sub: String,
    pub email: String,
    pub aud: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

#[derive(Clone)]
pub struct GoogleAuthService {
    http: reqwest::Client,
    client_id: String,
    endpoint: String,
}

impl GoogleAuthService {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self::with_endpoint(client_id, GOOGLE_TOKENINFO_URL)
    }

    // endpoint подменяется в тестах
    pub fn with_endpoint(client_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn validate_token(&self, id_token: &str) -> Result<GooglePayload, GoogleAuthError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        // Google отвечает 400 на любой невалидный токен
        if !response.status().is_success() {
            return Err(GoogleAuthError::InvalidToken);
        }

        let payload: GooglePayload = response.json().await?;

        if payload.aud != self.client_id {
            return Err(GoogleAuthError::AudienceMismatch);
        }

        Ok(payload)
    }
}
