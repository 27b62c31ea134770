use eventsmart::services::google::{GoogleAuthError, GoogleAuthService};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLIENT_ID: &str = "test-client.apps.googleusercontent.com";

#[tokio::test]
async fn valid_token_returns_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokeninfo"))
        .and(query_param("id_token", "good-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "109876543210",
            "email": "jane@example.com",
            "aud": CLIENT_ID,
            "given_name": "Jane",
            "family_name": "Doe",
        })))
        .mount(&server)
        .await;

    let service =
        GoogleAuthService::with_endpoint(CLIENT_ID, format!("{}/tokeninfo", server.uri()));
    let payload = service.validate_token("good-token").await.unwrap();

    assert_eq!(payload.sub, "109876543210");
    assert_eq!(payload.email, "jane@example.com");
    assert_eq!(payload.given_name.as_deref(), Some("Jane"));
}

#[tokio::test]
async fn audience_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokeninfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "109876543210",
            "email": "jane@example.com",
            "aud": "someone-else.apps.googleusercontent.com",
        })))
        .mount(&server)
        .await;

    let service =
        GoogleAuthService::with_endpoint(CLIENT_ID, format!("{}/tokeninfo", server.uri()));
    let err = service.validate_token("stolen-token").await.unwrap_err();

    assert!(matches!(err, GoogleAuthError::AudienceMismatch));
}

#[tokio::test]
async fn tokeninfo_error_maps_to_invalid_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokeninfo"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_token",
        })))
        .mount(&server)
        .await;

    let service =
        GoogleAuthService::with_endpoint(CLIENT_ID, format!("{}/tokeninfo", server.uri()));
    let err = service.validate_token("garbage").await.unwrap_err();

    assert!(matches!(err, GoogleAuthError::InvalidToken));
}

#[tokio::test]
async fn missing_optional_name_fields_are_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokeninfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "42",
            "email": "nameless@example.com",
            "aud": CLIENT_ID,
        })))
        .mount(&server)
        .await;

    let service =
        GoogleAuthService::with_endpoint(CLIENT_ID, format!("{}/tokeninfo", server.uri()));
    let payload = service.validate_token("token").await.unwrap();

    assert!(payload.given_name.is_none());
    assert!(payload.family_name.is_none());
}
