//! # Check Collection
//!
//! Gathers the complete CI round for a commit: every check suite from a
//! recognised provider together with its check runs.
//!
//! Collection is all or nothing. As soon as one in-scope suite or run is still
//! running the whole collection is abandoned with [`GatekeeperError::NotReady`];
//! the completion event of that last suite will trigger a fresh collection.

use ci_gatekeeper_developer_platforms::models::{CheckRun, CheckStatus, CheckSuite};
use ci_gatekeeper_developer_platforms::CheckProvider;
use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use crate::errors::GatekeeperError;
use crate::providers::{CiProvider, ProviderRegistry};

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;

/// A check suite from a recognised provider together with its check runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteResult {
    pub provider: CiProvider,
    pub suite: CheckSuite,
    pub runs: Vec<CheckRun>,
}

/// Collects the check suites and check runs for a commit.
///
/// Suites from providers that aren't on the allow-list are skipped without being
/// reported. The check runs of the remaining suites are fetched concurrently, but
/// only after every suite has been confirmed complete.
///
/// # Arguments
///
/// * `provider` - Source of check suites and runs
/// * `registry` - The recognised CI providers
/// * `repo_owner` - The owner of the repository
/// * `repo_name` - The name of the repository
/// * `head_sha` - The commit to collect results for
///
/// # Errors
///
/// * [`GatekeeperError::NotReady`] when an in-scope suite or run hasn't completed
/// * [`GatekeeperError::UpstreamFailure`] when listing suites or runs fails
#[instrument(skip(provider, registry))]
pub async fn collect_check_results<P: CheckProvider + ?Sized>(
    provider: &P,
    registry: &ProviderRegistry,
    repo_owner: &str,
    repo_name: &str,
    head_sha: &str,
) -> Result<Vec<SuiteResult>, GatekeeperError> {
    let suites = provider
        .list_check_suites(repo_owner, repo_name, head_sha)
        .await?;

    let mut in_scope = Vec::new();
    for suite in suites {
        let Some(ci) = registry.find(&suite.app_slug) else {
            debug!(
                head_sha = head_sha,
                check_suite = suite.id,
                app = suite.app_slug.as_str(),
                "Ignoring check suite from an unrecognised provider"
            );
            continue;
        };

        if !ci.completed(&suite) {
            info!(
                head_sha = head_sha,
                check_suite = suite.id,
                app = suite.app_slug.as_str(),
                "Check suite has not completed yet"
            );
            return Err(GatekeeperError::NotReady);
        }

        in_scope.push((ci.clone(), suite));
    }

    let run_lists = try_join_all(
        in_scope
            .iter()
            .map(|(_, suite)| provider.list_check_runs(repo_owner, repo_name, suite.id)),
    )
    .await?;

    let mut results = Vec::with_capacity(in_scope.len());
    for ((ci, suite), runs) in in_scope.into_iter().zip(run_lists) {
        if let Some(running) = runs.iter().find(|r| r.status != CheckStatus::Completed) {
            info!(
                head_sha = head_sha,
                check_suite = suite.id,
                check_run = running.name.as_str(),
                "Check run has not completed yet"
            );
            return Err(GatekeeperError::NotReady);
        }

        results.push(SuiteResult {
            provider: ci,
            suite,
            runs,
        });
    }

    debug!(
        head_sha = head_sha,
        count = results.len(),
        "Collected completed check suites"
    );
    Ok(results)
}
