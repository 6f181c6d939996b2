//! Password-grant flow against a mocked keycloak token endpoint.

use clinic_admin::auth::{Authenticator, LoginOutcome, MemoryTokenStore, TokenStore};
use clinic_admin::config::Config;
use serde_json::json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(issuer: &str) -> Config {
    Config {
        issuer_url: issuer.to_string(),
        realm: "clinic".to_string(),
        client_id: "clinic-frontend".to_string(),
        client_secret: "test-secret".to_string(),
        gateway_url: "http://localhost:8080".to_string(),
        redirect_uri: "http://localhost:8080/login.html".to_string(),
        token_file: None,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[tokio::test]
async fn successful_login_stores_tokens_and_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/realms/clinic/protocol/openid-connect/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=clinic-frontend"))
        .and(body_string_contains("client_secret=test-secret"))
        .and(body_string_contains("username=alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok123",
            "refresh_token": "ref456",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let auth = Authenticator::new(config(&server.uri()), store.clone());

    let before = now_ms();
    let outcome = auth.login_with_password("alice", "s3cret").await;
    assert!(outcome.is_success(), "expected success, got {:?}", outcome);

    assert_eq!(store.access_token().as_deref(), Some("tok123"));
    assert_eq!(store.refresh_token().as_deref(), Some("ref456"));

    let expiry = store.expiry_ms().expect("expiry stored");
    assert!(expiry >= before + 3_600_000);
    assert!(expiry <= now_ms() + 3_600_000);
}

#[tokio::test]
async fn rejected_login_surfaces_error_description() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/realms/clinic/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid user credentials"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let auth = Authenticator::new(config(&server.uri()), store.clone());

    match auth.login_with_password("alice", "wrong").await {
        LoginOutcome::Failure { message } => assert_eq!(message, "Invalid user credentials"),
        LoginOutcome::Success(_) => panic!("login should have been rejected"),
    }

    // nothing was stored on the failure path
    assert_eq!(store.access_token(), None);
}

#[tokio::test]
async fn rejection_without_description_gets_generic_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/realms/clinic/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("oops"))
        .mount(&server)
        .await;

    let auth = Authenticator::new(config(&server.uri()), Arc::new(MemoryTokenStore::new()));

    match auth.login_with_password("alice", "s3cret").await {
        LoginOutcome::Failure { message } => assert_eq!(message, "Login failed"),
        LoginOutcome::Success(_) => panic!("login should have been rejected"),
    }
}

#[tokio::test]
async fn unreachable_provider_is_a_failure_not_a_panic() {
    // nothing listens here
    let auth = Authenticator::new(
        config("http://127.0.0.1:1"),
        Arc::new(MemoryTokenStore::new()),
    );

    match auth.login_with_password("alice", "s3cret").await {
        LoginOutcome::Failure { message } => assert!(!message.is_empty()),
        LoginOutcome::Success(_) => panic!("there is no provider to succeed against"),
    }
}

#[tokio::test]
async fn login_without_refresh_or_expiry_still_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/realms/clinic/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-only"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let auth = Authenticator::new(config(&server.uri()), store.clone());

    assert!(auth.login_with_password("alice", "s3cret").await.is_success());
    assert_eq!(store.access_token().as_deref(), Some("tok-only"));
    assert_eq!(store.refresh_token(), None);
    assert_eq!(store.expiry_ms(), None);
}
