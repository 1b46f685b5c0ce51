use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use hmac::{Hmac, Mac};
use octocrab::Octocrab;
use serde_json::json;
use sha2::Sha256;

use super::*;
use crate::config::AppConfig;

const SECRET: &str = "It's a Secret to Everybody";

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn app_state() -> Arc<AppState> {
    let config = AppConfig::from_lookup(|key| match key {
        "GITHUB_APP_ID" => Some("1".to_string()),
        "GITHUB_APP_PRIVATE_KEY" => Some("key".to_string()),
        "GITHUB_WEBHOOK_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap();

    Arc::new(AppState::new(&config, Octocrab::default()))
}

fn signed_headers(event: &str, body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(EVENT_HEADER, HeaderValue::from_str(event).unwrap());
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&sign(SECRET, body)).unwrap(),
    );
    headers.insert(DELIVERY_HEADER, HeaderValue::from_static("72d3162e"));
    headers
}

fn check_suite_body(action: &str, with_installation: bool) -> Vec<u8> {
    check_suite_body_from("cirrus-ci", action, with_installation)
}

fn check_suite_body_from(slug: &str, action: &str, with_installation: bool) -> Vec<u8> {
    let mut payload = json!({
        "action": action,
        "check_suite": {
            "id": 5,
            "head_sha": "0a1b2c3d",
            "status": "completed",
            "conclusion": "success",
            "app": { "slug": slug }
        },
        "repository": { "name": "widgets", "owner": { "login": "hashgraph" } }
    });
    if with_installation {
        payload["installation"] = json!({ "id": 77 });
    }

    serde_json::to_vec(&payload).unwrap()
}

fn comment_body(action: &str, body: &str, with_installation: bool) -> Vec<u8> {
    let mut payload = json!({
        "action": action,
        "issue": {
            "number": 12,
            "state": "open",
            "user": { "id": 100, "login": "alice" },
            "pull_request": { "html_url": "https://github.com/hashgraph/widgets/pull/12" }
        },
        "comment": {
            "id": 9,
            "body": body,
            "user": { "id": 200, "login": "bob" },
            "author_association": "OWNER"
        },
        "repository": { "name": "widgets", "owner": { "login": "hashgraph" } }
    });
    if with_installation {
        payload["installation"] = json!({ "id": 77 });
    }

    serde_json::to_vec(&payload).unwrap()
}

async fn deliver(headers: HeaderMap, body: Vec<u8>) -> Result<StatusCode, WebhookError> {
    handle_webhook(State(app_state()), headers, Bytes::from(body)).await
}

#[test]
fn test_verify_signature_accepts_valid_signature() {
    let body = b"Hello, World!";
    let header = sign(SECRET, body);

    assert!(verify_signature(SECRET, &header, body).is_ok());
}

#[test]
fn test_verify_signature_matches_github_reference_value() {
    let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

    assert!(verify_signature(SECRET, header, b"Hello, World!").is_ok());
}

#[test]
fn test_verify_signature_rejects_wrong_secret() {
    let body = b"Hello, World!";
    let header = sign("another secret", body);

    assert!(matches!(
        verify_signature(SECRET, &header, body),
        Err(WebhookError::InvalidSignature)
    ));
}

#[test]
fn test_verify_signature_rejects_tampered_body() {
    let header = sign(SECRET, b"Hello, World!");

    assert!(matches!(
        verify_signature(SECRET, &header, b"Hello, World?"),
        Err(WebhookError::InvalidSignature)
    ));
}

#[test]
fn test_verify_signature_rejects_missing_prefix() {
    let body = b"Hello, World!";
    let header = sign(SECRET, body).replace("sha256=", "");

    assert!(matches!(
        verify_signature(SECRET, &header, body),
        Err(WebhookError::InvalidSignature)
    ));
}

#[test]
fn test_verify_signature_rejects_invalid_hex() {
    assert!(matches!(
        verify_signature(SECRET, "sha256=not-hex", b"Hello, World!"),
        Err(WebhookError::InvalidSignature)
    ));
}

#[test]
fn test_webhook_error_status_codes() {
    let cases = [
        (WebhookError::MissingHeader(EVENT_HEADER), StatusCode::BAD_REQUEST),
        (WebhookError::MissingSignature, StatusCode::UNAUTHORIZED),
        (WebhookError::InvalidSignature, StatusCode::UNAUTHORIZED),
        (WebhookError::MissingInstallation, StatusCode::BAD_REQUEST),
        (
            WebhookError::AuthFailed("token".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, status) in cases {
        assert_eq!(error.into_response().status(), status);
    }
}

#[tokio::test]
async fn test_health() {
    let (status, body) = health().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_delivery_without_signature_is_unauthorized() {
    let body = check_suite_body("completed", true);
    let mut headers = signed_headers("check_suite", &body);
    headers.remove(SIGNATURE_HEADER);

    let result = deliver(headers, body).await;

    assert!(matches!(result, Err(WebhookError::MissingSignature)));
}

#[tokio::test]
async fn test_delivery_with_invalid_signature_is_unauthorized() {
    let body = check_suite_body("completed", true);
    let mut headers = signed_headers("check_suite", &body);
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&sign("wrong", &body)).unwrap(),
    );

    let result = deliver(headers, body).await;

    assert!(matches!(result, Err(WebhookError::InvalidSignature)));
}

#[tokio::test]
async fn test_delivery_without_event_header_is_rejected() {
    let body = check_suite_body("completed", true);
    let mut headers = signed_headers("check_suite", &body);
    headers.remove(EVENT_HEADER);

    let result = deliver(headers, body).await;

    assert!(matches!(
        result,
        Err(WebhookError::MissingHeader(EVENT_HEADER))
    ));
}

#[tokio::test]
async fn test_ping_is_acknowledged() {
    let body = br#"{"zen":"Keep it logically awesome."}"#.to_vec();
    let headers = signed_headers("ping", &body);

    let result = deliver(headers, body).await;

    assert_eq!(result.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_unsupported_event_is_acknowledged() {
    let body = br#"{"action":"opened"}"#.to_vec();
    let headers = signed_headers("pull_request", &body);

    let result = deliver(headers, body).await;

    assert_eq!(result.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_check_suite_payload_is_rejected() {
    let body = br#"{"action":"completed"}"#.to_vec();
    let headers = signed_headers("check_suite", &body);

    let result = deliver(headers, body).await;

    assert!(matches!(result, Err(WebhookError::InvalidPayload(_))));
}

#[tokio::test]
async fn test_requested_check_suite_is_acknowledged_without_processing() {
    let body = check_suite_body("requested", false);
    let headers = signed_headers("check_suite", &body);

    let result = deliver(headers, body).await;

    assert_eq!(result.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_check_suite_from_unrecognised_provider_is_acknowledged_without_processing() {
    let body = check_suite_body_from("dependabot", "completed", false);
    let headers = signed_headers("check_suite", &body);

    let result = deliver(headers, body).await;

    assert_eq!(result.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_completed_check_suite_without_installation_is_rejected() {
    let body = check_suite_body("completed", false);
    let headers = signed_headers("check_suite", &body);

    let result = deliver(headers, body).await;

    assert!(matches!(result, Err(WebhookError::MissingInstallation)));
}

#[tokio::test]
async fn test_ordinary_comment_is_acknowledged_without_processing() {
    let body = comment_body("created", "Looks good to me!", false);
    let headers = signed_headers("issue_comment", &body);

    let result = deliver(headers, body).await;

    assert_eq!(result.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_edited_instruction_is_acknowledged_without_processing() {
    let body = comment_body("edited", "/merge", false);
    let headers = signed_headers("issue_comment", &body);

    let result = deliver(headers, body).await;

    assert_eq!(result.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_instruction_without_installation_is_rejected() {
    let body = comment_body("created", "/merge", false);
    let headers = signed_headers("issue_comment", &body);

    let result = deliver(headers, body).await;

    assert!(matches!(result, Err(WebhookError::MissingInstallation)));
}

#[test]
fn test_repository_providers_are_restricted_to_server_providers() {
    let registry = ProviderRegistry::from_config(&GatekeeperConfig::default().checks);
    let mut config = GatekeeperConfig::default();
    config.checks.providers = vec!["cirrus-ci".to_string(), "circleci".to_string()];

    let restricted = restrict_providers(config, &registry);

    assert_eq!(restricted.checks.providers, vec!["cirrus-ci".to_string()]);
    let effective = ProviderRegistry::from_config(&restricted.checks);
    assert!(effective.recognizes("cirrus-ci"));
    assert!(!effective.recognizes("circleci"));
    assert!(!effective.recognizes("github-actions"));
}

#[test]
fn test_default_repository_providers_are_kept() {
    let registry = ProviderRegistry::from_config(&GatekeeperConfig::default().checks);

    let restricted = restrict_providers(GatekeeperConfig::default(), &registry);

    assert_eq!(restricted, GatekeeperConfig::default());
}
