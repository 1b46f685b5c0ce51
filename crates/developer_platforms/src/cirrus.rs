//! # Cirrus CI
//!
//! Resolves Cirrus CI task ids to pull request numbers through the Cirrus CI
//! GraphQL API. Cirrus CI reports the task id as the `external_id` of every
//! check run it creates.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::{errors::Error, ProviderAdapter};

#[cfg(test)]
#[path = "cirrus_tests.rs"]
mod tests;

/// Public endpoint of the Cirrus CI GraphQL API.
pub const CIRRUS_API_URL: &str = "https://api.cirrus-ci.com/graphql";

/// App slug under which Cirrus CI reports check suites.
pub const CIRRUS_CI_SLUG: &str = "cirrus-ci";

const TASK_PULL_REQUEST_QUERY: &str =
    "query TaskPullRequest($taskId: ID!) { task(id: $taskId) { build { pullRequest } } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<TaskData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    task: Option<Task>,
}

#[derive(Debug, Deserialize)]
struct Task {
    build: Option<Build>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Build {
    pull_request: Option<i64>,
}

/// [`ProviderAdapter`] for Cirrus CI.
#[derive(Debug, Clone)]
pub struct CirrusCiAdapter {
    client: reqwest::Client,
    api_url: String,
}

impl CirrusCiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_api_url(client, CIRRUS_API_URL)
    }

    pub fn with_api_url(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for CirrusCiAdapter {
    fn provider_slug(&self) -> &str {
        CIRRUS_CI_SLUG
    }

    #[instrument(skip(self))]
    async fn find_pull_request(&self, external_task_id: &str) -> Result<Option<u64>, Error> {
        let payload = json!({
            "query": TASK_PULL_REQUEST_QUERY,
            "variables": { "taskId": external_task_id },
        });

        let response = self
            .client
            .post(&self.api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::ApiError(format!("Cirrus CI request failed: {}", e)))?;

        if !response.status().is_success() {
            warn!(
                task = external_task_id,
                status = response.status().as_u16(),
                "Cirrus CI rejected the task lookup"
            );
            return Err(Error::ApiError(format!(
                "Cirrus CI returned status {}",
                response.status()
            )));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|_| Error::InvalidResponse)?;

        if let Some(first) = body.errors.first() {
            return Err(Error::ApiError(first.message.clone()));
        }

        // Cirrus CI reports builds without a pull request as either null or -1
        let pull_request = body
            .data
            .and_then(|d| d.task)
            .and_then(|t| t.build)
            .and_then(|b| b.pull_request)
            .filter(|n| *n > 0)
            .map(|n| n as u64);

        debug!(
            task = external_task_id,
            pull_request = pull_request,
            "Resolved Cirrus CI task"
        );
        Ok(pull_request)
    }
}
