//! Receives GitHub webhook deliveries and hands them to the gatekeeper.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use ci_gatekeeper_core::{
    commands::Instruction,
    config::{load_repository_config, GatekeeperConfig},
    errors::GatekeeperError,
    events::{CheckSuiteAction, CheckSuiteEvent, CommentAction, IssueCommentEvent},
    providers::ProviderRegistry,
    Gatekeeper,
};
use ci_gatekeeper_developer_platforms::{
    cirrus::CirrusCiAdapter,
    github::{authenticate_with_access_token, GitHubProvider},
};
use hmac::{Hmac, Mac};
use octocrab::Octocrab;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;

pub const EVENT_HEADER: &str = "x-github-event";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

type HmacSha256 = Hmac<Sha256>;

/// Reasons a delivery is rejected before it reaches the gatekeeper.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Event has no installation")]
    MissingInstallation,

    #[error("Failed to authenticate with GitHub: {0}")]
    AuthFailed(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_)
            | WebhookError::InvalidPayload(_)
            | WebhookError::MissingInstallation => StatusCode::BAD_REQUEST,
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::AuthFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Shared by all requests.
pub struct AppState {
    github: Octocrab,
    webhook_secret: String,
    defaults: GatekeeperConfig,
    registry: ProviderRegistry,
    cirrus_api_url: String,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: &AppConfig, github: Octocrab) -> Self {
        Self {
            github,
            webhook_secret: config.webhook_secret.clone(),
            defaults: config.defaults.clone(),
            registry: ProviderRegistry::from_config(&config.defaults.checks),
            cirrus_api_url: config.cirrus_api_url.clone(),
            http: reqwest::Client::new(),
        }
    }

    async fn provider_for(
        &self,
        installation_id: Option<u64>,
        owner: &str,
        repo: &str,
    ) -> Result<GitHubProvider, WebhookError> {
        let installation_id = installation_id.ok_or(WebhookError::MissingInstallation)?;
        let client = authenticate_with_access_token(&self.github, installation_id, owner, repo)
            .await
            .map_err(|e| WebhookError::AuthFailed(e.to_string()))?;

        Ok(GitHubProvider::new(client))
    }

    async fn gatekeeper_for(
        &self,
        provider: GitHubProvider,
        owner: &str,
        repo: &str,
    ) -> Gatekeeper<GitHubProvider> {
        let config = load_repository_config(&provider, owner, repo, &self.defaults).await;
        let config = restrict_providers(config, &self.registry);
        let cirrus = CirrusCiAdapter::with_api_url(self.http.clone(), &self.cirrus_api_url);

        Gatekeeper::with_config(provider, config).with_adapter(Arc::new(cirrus))
    }
}

/// Drops the CI providers of a repository configuration that the server doesn't
/// accept events from.
fn restrict_providers(
    mut config: GatekeeperConfig,
    registry: &ProviderRegistry,
) -> GatekeeperConfig {
    config.checks.providers.retain(|slug| {
        let accepted = registry.recognizes(slug);
        if !accepted {
            warn!(
                app = slug.as_str(),
                "Ignoring CI provider missing from the server configuration"
            );
        }
        accepted
    });
    config
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/webhook", post(handle_webhook))
        .with_state(state)
}

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Checks the `sha256=` HMAC signature GitHub attaches to every delivery.
pub fn verify_signature(secret: &str, header: &str, body: &[u8]) -> Result<(), WebhookError> {
    let signature = header
        .strip_prefix("sha256=")
        .ok_or(WebhookError::InvalidSignature)?;
    let expected = hex::decode(signature).map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::InvalidSignature)
}

fn get_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handles one webhook delivery.
///
/// Failures inside the gatekeeper are logged and acknowledged with `200 OK`;
/// GitHub retrying the delivery would not change the outcome.
#[instrument(skip(state, headers, body), fields(delivery = tracing::field::Empty))]
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    if let Some(delivery) = get_header(&headers, DELIVERY_HEADER) {
        tracing::Span::current().record("delivery", delivery);
    }

    let signature = get_header(&headers, SIGNATURE_HEADER).ok_or_else(|| {
        warn!("Received a delivery without a signature");
        WebhookError::MissingSignature
    })?;
    verify_signature(&state.webhook_secret, signature, &body).inspect_err(|_| {
        warn!("Received a delivery with an invalid signature");
    })?;

    let event =
        get_header(&headers, EVENT_HEADER).ok_or(WebhookError::MissingHeader(EVENT_HEADER))?;
    match event {
        "check_suite" => {
            let event: CheckSuiteEvent = serde_json::from_slice(&body)?;
            handle_check_suite(&state, event).await
        }
        "issue_comment" => {
            let event: IssueCommentEvent = serde_json::from_slice(&body)?;
            handle_comment(&state, event).await
        }
        "ping" => {
            info!("Received ping");
            Ok(StatusCode::OK)
        }
        other => {
            debug!(event = other, "Ignoring unsupported event");
            Ok(StatusCode::OK)
        }
    }
}

async fn handle_check_suite(
    state: &AppState,
    event: CheckSuiteEvent,
) -> Result<StatusCode, WebhookError> {
    if event.action != CheckSuiteAction::Completed {
        debug!(action = ?event.action, "Ignoring check suite action");
        return Ok(StatusCode::OK);
    }

    // Repository configuration can narrow the provider list but never widen it
    let slug = event.check_suite.app.slug.as_str();
    if !state.registry.recognizes(slug) {
        debug!(app = slug, "Ignoring check suite from an unrecognised provider");
        return Ok(StatusCode::OK);
    }

    let owner = event.repository.owner.login.as_str();
    let repo = event.repository.name.as_str();
    let provider = state
        .provider_for(event.installation_id(), owner, repo)
        .await?;
    let gatekeeper = state.gatekeeper_for(provider, owner, repo).await;

    log_result("check_suite", gatekeeper.process_check_suite(&event).await);
    Ok(StatusCode::OK)
}

async fn handle_comment(
    state: &AppState,
    event: IssueCommentEvent,
) -> Result<StatusCode, WebhookError> {
    if event.action != CommentAction::Created
        || Instruction::parse(&event.comment.body).is_none()
    {
        debug!(action = ?event.action, "Ignoring comment");
        return Ok(StatusCode::OK);
    }

    let owner = event.repository.owner.login.as_str();
    let repo = event.repository.name.as_str();
    let provider = state
        .provider_for(event.installation_id(), owner, repo)
        .await?;
    let gatekeeper = state.gatekeeper_for(provider, owner, repo).await;

    log_result("issue_comment", gatekeeper.process_comment(&event).await);
    Ok(StatusCode::OK)
}

fn log_result<T: std::fmt::Debug>(event: &str, result: Result<T, GatekeeperError>) {
    match result {
        Ok(outcome) => info!(event, outcome = ?outcome, "Processed event"),
        Err(e) if e.is_silent() => info!(event, reason = %e, "Nothing to report"),
        Err(e) => error!(event, error = %e, "Failed to process event"),
    }
}
