use async_trait::async_trait;
use base64::Engine;
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    errors::Error,
    models::{
        CheckConclusion, CheckRun, CheckStatus, CheckSuite, IssueState, IssueSummary, Label,
        MergeRequest, MergeResult, PullRequest, User,
    },
    CheckProvider, ConfigFetcher, PullRequestProvider,
};

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;

/// Maximum page size GitHub accepts for list endpoints.
const PAGE_SIZE: u8 = 100;

#[derive(Debug, Serialize)]
struct PageParameters {
    per_page: u8,
    page: u32,
}

#[derive(Debug, Serialize)]
struct SearchParameters {
    q: String,
    per_page: u8,
}

#[derive(Debug, Deserialize)]
struct CheckSuitePage {
    total_count: u64,
    check_suites: Vec<GitHubCheckSuite>,
}

#[derive(Debug, Deserialize)]
struct GitHubCheckSuite {
    id: u64,
    head_sha: String,
    status: Option<CheckStatus>,
    conclusion: Option<CheckConclusion>,
    app: Option<GitHubApp>,
}

#[derive(Debug, Deserialize)]
struct GitHubApp {
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckRunPage {
    total_count: u64,
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    items: Vec<IssueSummary>,
}

#[derive(Debug, Deserialize)]
struct GitHubPullRequest {
    number: u64,
    title: Option<String>,
    state: IssueState,
    #[serde(default)]
    draft: Option<bool>,
    head: GitHubBranch,
    mergeable: Option<bool>,
    user: Option<User>,
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct GitHubBranch {
    sha: String,
    #[serde(rename = "ref")]
    name: String,
}

impl From<GitHubCheckSuite> for CheckSuite {
    fn from(suite: GitHubCheckSuite) -> Self {
        CheckSuite {
            id: suite.id,
            app_slug: suite.app.and_then(|a| a.slug).unwrap_or_default(),
            status: suite.status.unwrap_or(CheckStatus::Unknown),
            conclusion: suite.conclusion,
            head_sha: suite.head_sha,
        }
    }
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            state: pr.state,
            draft: pr.draft.unwrap_or_default(),
            head_sha: pr.head.sha,
            head_ref: pr.head.name,
            mergeable: pr.mergeable,
            author: pr.user,
            labels: pr.labels,
        }
    }
}

/// Authenticates with GitHub using an installation access token for a specific app installation.
///
/// This function retrieves an access token for a GitHub App installation and creates a new
/// `Octocrab` client authenticated with that token.
///
/// # Arguments
///
/// * `octocrab` - An `Octocrab` client authenticated as the GitHub App.
/// * `installation_id` - The ID of the GitHub App installation.
/// * `repository_owner` - The owner of the repository associated with the installation.
/// * `source_repository` - The name of the repository associated with the installation.
///
/// # Errors
///
/// Returns [`Error::FailedToCreateAccessToken`] if the installation can't be found or the
/// token can't be created.
///
/// # Example
///
/// ```rust,no_run
/// use octocrab::Octocrab;
/// use ci_gatekeeper_developer_platforms::github::authenticate_with_access_token;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let octocrab = Octocrab::builder().build()?;
///
///     let authenticated_client =
///         authenticate_with_access_token(&octocrab, 12345678, "example-owner", "example-repo")
///             .await?;
///
///     // Use `authenticated_client` to perform API operations
///     Ok(())
/// }
/// ```
#[instrument(skip(octocrab))]
pub async fn authenticate_with_access_token(
    octocrab: &Octocrab,
    installation_id: u64,
    repository_owner: &str,
    source_repository: &str,
) -> Result<Octocrab, Error> {
    debug!(
        repository_owner = repository_owner,
        repository = source_repository,
        installation_id,
        "Finding installation"
    );

    let (api_with_token, _) = octocrab
        .installation_and_token(installation_id.into())
        .await
        .map_err(|e| {
            log_octocrab_error("Failed to create a token for the installation", e);
            Error::FailedToCreateAccessToken(
                repository_owner.to_string(),
                source_repository.to_string(),
                installation_id,
            )
        })?;

    info!(
        repository_owner = repository_owner,
        repository = source_repository,
        installation_id,
        "Created access token for installation",
    );

    Ok(api_with_token)
}

/// Creates an `Octocrab` client authenticated as a GitHub App.
///
/// # Arguments
///
/// * `app_id` - The ID of the GitHub App.
/// * `private_key` - The private key associated with the GitHub App, in PEM format.
///
/// # Errors
///
/// Returns [`Error::AuthError`] if the private key can't be parsed or the client can't be
/// built.
#[instrument(skip(private_key))]
pub fn create_app_client(app_id: u64, private_key: &str) -> Result<Octocrab, Error> {
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        Error::AuthError(format!(
            "Failed to translate the private key. Error was: {}",
            e
        ))
    })?;

    let octocrab = Octocrab::builder()
        .app(app_id.into(), key)
        .build()
        .map_err(|_| Error::AuthError("Failed to build the GitHub app client.".to_string()))?;

    info!(app_id, "Created client for the GitHub app");
    Ok(octocrab)
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = *source;
            error!(
                error_message = err.message.as_str(),
                status = err.status_code.as_u16(),
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}

/// Translates an octocrab failure into a platform error, logging the details.
///
/// `404` becomes [`Error::NotFound`], `401` an [`Error::AuthError`] and a rate limit
/// rejection [`Error::RateLimitExceeded`]. Everything else is produced by `fallback`.
fn to_platform_error(message: &str, e: octocrab::Error, fallback: impl FnOnce() -> Error) -> Error {
    if let octocrab::Error::GitHub { source, .. } = &e {
        match source.status_code.as_u16() {
            404 => {
                debug!(error_message = source.message.as_str(), "{}. Resource not found", message);
                return Error::NotFound(message.to_string());
            }
            401 => {
                let reason = source.message.clone();
                log_octocrab_error(message, e);
                return Error::AuthError(reason);
            }
            403 | 429 if source.message.to_lowercase().contains("rate limit") => {
                warn!(error_message = source.message.as_str(), "{}. Rate limited", message);
                return Error::RateLimitExceeded;
            }
            _ => {}
        }
    }

    log_octocrab_error(message, e);
    fallback()
}

/// [`PullRequestProvider`], [`CheckProvider`] and [`ConfigFetcher`] backed by the GitHub
/// REST API.
#[derive(Debug, Default)]
pub struct GitHubProvider {
    client: Octocrab,
}

impl GitHubProvider {
    /// Fetch the content of a file from the repository at the given path.
    /// Without a `reference` the file is read from the default branch.
    /// Returns Ok(Some(content)) if found, Ok(None) if not found, or Err on error.
    pub async fn fetch_file_content(
        &self,
        repo_owner: &str,
        repo_name: &str,
        path: &str,
        reference: Option<&str>,
    ) -> Result<Option<String>, Error> {
        let repo = self.client.repos(repo_owner, repo_name);
        let mut request = repo.get_content().path(path);
        if let Some(reference) = reference {
            request = request.r#ref(reference);
        }
        let content_result = request.send().await;

        let response = match content_result {
            Ok(r) => r,
            Err(e) => {
                return match to_platform_error("Failed to fetch file content", e, || {
                    Error::ApiError(format!("Failed to fetch {}", path))
                }) {
                    Error::NotFound(_) => Ok(None),
                    other => Err(other),
                }
            }
        };

        let Some(content) = response.items.into_iter().next().and_then(|f| f.content) else {
            return Ok(None);
        };

        // GitHub returns base64 encoded content with embedded newlines
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(content.replace('\n', ""))
            .map_err(|_| Error::InvalidResponse)?;
        let content_str = String::from_utf8(decoded).map_err(|_| Error::InvalidResponse)?;
        Ok(Some(content_str))
    }

    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigFetcher for GitHubProvider {
    #[instrument(skip(self))]
    async fn fetch_config(
        &self,
        repo_owner: &str,
        repo_name: &str,
        path: &str,
    ) -> Result<Option<String>, Error> {
        self.fetch_file_content(repo_owner, repo_name, path, None).await
    }
}

#[async_trait]
impl CheckProvider for GitHubProvider {
    #[instrument(skip(self))]
    async fn list_check_suites(
        &self,
        repo_owner: &str,
        repo_name: &str,
        git_ref: &str,
    ) -> Result<Vec<CheckSuite>, Error> {
        let route = format!(
            "/repos/{}/{}/commits/{}/check-suites",
            repo_owner, repo_name, git_ref
        );

        let mut suites = Vec::new();
        let mut page = 1;
        loop {
            let parameters = PageParameters {
                per_page: PAGE_SIZE,
                page,
            };
            let response: CheckSuitePage = self
                .client
                .get(&route, Some(&parameters))
                .await
                .map_err(|e| {
                    to_platform_error("Failed to list check suites", e, || Error::InvalidResponse)
                })?;

            let received = response.check_suites.len();
            suites.extend(response.check_suites.into_iter().map(CheckSuite::from));
            if received == 0 || suites.len() as u64 >= response.total_count {
                break;
            }

            page += 1;
        }

        debug!(
            repository_owner = repo_owner,
            repository = repo_name,
            git_ref = git_ref,
            count = suites.len(),
            "Listed check suites"
        );
        Ok(suites)
    }

    #[instrument(skip(self))]
    async fn list_check_runs(
        &self,
        repo_owner: &str,
        repo_name: &str,
        check_suite_id: u64,
    ) -> Result<Vec<CheckRun>, Error> {
        let route = format!(
            "/repos/{}/{}/check-suites/{}/check-runs",
            repo_owner, repo_name, check_suite_id
        );

        let mut runs = Vec::new();
        let mut page = 1;
        loop {
            let parameters = PageParameters {
                per_page: PAGE_SIZE,
                page,
            };
            let response: CheckRunPage = self
                .client
                .get(&route, Some(&parameters))
                .await
                .map_err(|e| {
                    to_platform_error("Failed to list check runs", e, || Error::InvalidResponse)
                })?;

            let received = response.check_runs.len();
            runs.extend(response.check_runs);
            if received == 0 || runs.len() as u64 >= response.total_count {
                break;
            }

            page += 1;
        }

        Ok(runs)
    }
}

#[async_trait]
impl PullRequestProvider for GitHubProvider {
    #[instrument(skip(self))]
    async fn get_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error> {
        let route = format!("/repos/{}/{}/pulls/{}", repo_owner, repo_name, pr_number);
        let pr: GitHubPullRequest = self
            .client
            .get(route, None::<&()>)
            .await
            .map_err(|e| {
                to_platform_error("Failed to get pull request information", e, || {
                    Error::InvalidResponse
                })
            })?;

        Ok(pr.into())
    }

    #[instrument(skip(self, comment))]
    async fn add_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        comment: &str,
    ) -> Result<(), Error> {
        let route = format!(
            "/repos/{}/{}/issues/{}/comments",
            repo_owner, repo_name, pr_number
        );
        let _: serde_json::Value = self
            .client
            .post(route, Some(&json!({ "body": comment })))
            .await
            .map_err(|e| {
                to_platform_error("Failed to add comment", e, || {
                    Error::FailedToUpdatePullRequest("Failed to add comment".to_string())
                })
            })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error> {
        let route = format!(
            "/repos/{}/{}/issues/{}/labels",
            repo_owner, repo_name, pr_number
        );

        let mut labels = Vec::new();
        let mut page = 1;
        loop {
            let parameters = PageParameters {
                per_page: PAGE_SIZE,
                page,
            };
            let response: Vec<Label> = self
                .client
                .get(&route, Some(&parameters))
                .await
                .map_err(|e| {
                    to_platform_error("Failed to list labels", e, || Error::InvalidResponse)
                })?;

            let received = response.len();
            labels.extend(response);
            if received < PAGE_SIZE as usize {
                break;
            }

            page += 1;
        }

        Ok(labels)
    }

    #[instrument(skip(self))]
    async fn add_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<(), Error> {
        let route = format!(
            "/repos/{}/{}/issues/{}/labels",
            repo_owner, repo_name, pr_number
        );
        let _: serde_json::Value = self
            .client
            .post(route, Some(&json!({ "labels": labels })))
            .await
            .map_err(|e| {
                to_platform_error("Failed to add new labels", e, || {
                    Error::FailedToUpdatePullRequest("Failed to add labels".to_string())
                })
            })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error> {
        // Label names such as `ci/success` contain characters that must not end up as path
        // separators.
        let route = format!(
            "/repos/{}/{}/issues/{}/labels/{}",
            repo_owner,
            repo_name,
            pr_number,
            urlencoding::encode(label)
        );
        let _: serde_json::Value = self
            .client
            .delete(route, None::<&()>)
            .await
            .map_err(|e| {
                to_platform_error("Failed to remove label", e, || {
                    Error::FailedToUpdatePullRequest("Failed to remove label".to_string())
                })
            })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn replace_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<(), Error> {
        let route = format!(
            "/repos/{}/{}/issues/{}/labels",
            repo_owner, repo_name, pr_number
        );
        let _: serde_json::Value = self
            .client
            .put(route, Some(&json!({ "labels": labels })))
            .await
            .map_err(|e| {
                to_platform_error("Failed to replace labels", e, || {
                    Error::FailedToUpdatePullRequest("Failed to replace labels".to_string())
                })
            })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_issue_state(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        state: IssueState,
    ) -> Result<(), Error> {
        let route = format!("/repos/{}/{}/issues/{}", repo_owner, repo_name, pr_number);
        let _: serde_json::Value = self
            .client
            .patch(route, Some(&json!({ "state": state.as_str() })))
            .await
            .map_err(|e| {
                to_platform_error("Failed to update issue state", e, || {
                    Error::FailedToUpdatePullRequest("Failed to update state".to_string())
                })
            })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn merge_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        request: &MergeRequest,
    ) -> Result<MergeResult, Error> {
        let route = format!(
            "/repos/{}/{}/pulls/{}/merge",
            repo_owner, repo_name, pr_number
        );
        let payload = json!({
            "commit_title": request.title,
            "commit_message": request.message,
            "merge_method": request.method.as_str(),
        });

        self.client
            .put(route, Some(&payload))
            .await
            .map_err(|e| {
                to_platform_error("Failed to merge pull request", e, || {
                    Error::FailedToUpdatePullRequest("Failed to merge".to_string())
                })
            })
    }

    #[instrument(skip(self))]
    async fn search_issues_by_commit(&self, sha: &str) -> Result<Vec<IssueSummary>, Error> {
        let parameters = SearchParameters {
            q: format!("{} SHA", sha),
            per_page: PAGE_SIZE,
        };
        let response: SearchPage = self
            .client
            .get("/search/issues", Some(&parameters))
            .await
            .map_err(|e| {
                to_platform_error("Failed to search issues by commit", e, || {
                    Error::InvalidResponse
                })
            })?;

        debug!(
            head_sha = sha,
            count = response.items.len(),
            "Searched issues referencing commit"
        );
        Ok(response.items)
    }
}
