//! # Pull Request Resolution
//!
//! Finds the open pull requests of the current repository that a commit belongs to.
//!
//! The platform search is tried first. Its results are not scoped to a repository,
//! so every hit is parsed into an [`IssueReference`] and dropped unless it is an
//! open pull request of the repository that sent the event. When the search finds
//! nothing, CI providers that can map their own task ids to pull requests are asked
//! through their [`ProviderAdapter`].

use std::collections::BTreeMap;
use std::sync::Arc;

use ci_gatekeeper_developer_platforms::models::{IssueState, User};
use ci_gatekeeper_developer_platforms::{ProviderAdapter, PullRequestProvider};
use tracing::{debug, instrument, warn};

use crate::collector::SuiteResult;
use crate::errors::GatekeeperError;
use crate::references::IssueReference;

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// An open pull request that a commit belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub reference: IssueReference,
    pub state: IssueState,
    pub author: Option<User>,

    /// Only known when the pull request was fetched directly
    pub head_sha: Option<String>,
}

impl PullRequestRef {
    pub fn number(&self) -> u64 {
        self.reference.number
    }

    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|u| u.login.as_str())
    }
}

/// Resolves the open pull requests of `repo_owner/repo_name` that reference `head_sha`.
///
/// The result is sorted by pull request number and holds each pull request once.
/// An empty result is a normal outcome.
///
/// # Errors
///
/// Returns [`GatekeeperError::UpstreamFailure`] when the search, a provider lookup
/// or fetching a pull request fails.
#[instrument(skip(provider, adapters, results))]
pub async fn resolve_pull_requests<P: PullRequestProvider + ?Sized>(
    provider: &P,
    adapters: &[Arc<dyn ProviderAdapter>],
    results: &[SuiteResult],
    repo_owner: &str,
    repo_name: &str,
    head_sha: &str,
) -> Result<Vec<PullRequestRef>, GatekeeperError> {
    let mut resolved = BTreeMap::new();

    let items = provider.search_issues_by_commit(head_sha).await?;
    for item in items {
        let reference = match IssueReference::parse(&item.html_url) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    head_sha = head_sha,
                    url = item.html_url.as_str(),
                    error = %e,
                    "Skipping search result with an unexpected link"
                );
                continue;
            }
        };

        if item.state != IssueState::Open
            || !reference.is_pull_request()
            || !reference.is_in(repo_owner, repo_name)
        {
            debug!(
                head_sha = head_sha,
                reference = %reference,
                "Search result is out of scope"
            );
            continue;
        }

        resolved.insert(
            reference.number,
            PullRequestRef {
                reference,
                state: item.state,
                author: Some(item.user),
                head_sha: None,
            },
        );
    }

    if resolved.is_empty() {
        for number in lookup_task_pull_requests(adapters, results).await? {
            let pr = provider
                .get_pull_request(repo_owner, repo_name, number)
                .await?;
            if pr.state != IssueState::Open {
                debug!(
                    head_sha = head_sha,
                    pull_request = number,
                    "Pull request found by the CI provider is not open"
                );
                continue;
            }

            resolved.insert(
                number,
                PullRequestRef {
                    reference: IssueReference::pull(repo_owner, repo_name, number),
                    state: pr.state,
                    author: pr.author,
                    head_sha: Some(pr.head_sha),
                },
            );
        }
    }

    debug!(
        head_sha = head_sha,
        count = resolved.len(),
        "Resolved pull requests for commit"
    );
    Ok(resolved.into_values().collect())
}

/// Asks the matching adapter of every provider with task lookup support which
/// pull request each of its tasks was built for.
async fn lookup_task_pull_requests(
    adapters: &[Arc<dyn ProviderAdapter>],
    results: &[SuiteResult],
) -> Result<Vec<u64>, GatekeeperError> {
    let mut numbers = Vec::new();
    for result in results {
        if !result.provider.supports_task_lookup() {
            continue;
        }

        let Some(adapter) = adapters
            .iter()
            .find(|a| result.provider.recognizes(a.provider_slug()))
        else {
            continue;
        };

        for task_id in result.runs.iter().filter_map(|r| r.external_id.as_deref()) {
            if let Some(number) = adapter.find_pull_request(task_id).await? {
                if !numbers.contains(&number) {
                    numbers.push(number);
                }
            }
        }
    }

    Ok(numbers)
}
