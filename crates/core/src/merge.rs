//! # Merging
//!
//! A merge instruction passes the merge gate before anything irreversible happens.
//! The gate checks, in this order:
//!
//! 1. the pull request is mergeable
//! 2. every check suite of its head commit has completed
//! 3. every completed suite concluded with success or skipped
//!
//! Only the first failing check is reported. A pull request whose mergeability is
//! still being computed counts as not mergeable.
//!
//! The gate hands out an [`ApprovedMerge`] which can't be built any other way, and
//! [`execute_merge`] accepts nothing else.

use ci_gatekeeper_developer_platforms::models::{
    CheckConclusion, CheckStatus, CheckSuite, MergeMethod, MergeRequest, PullRequest,
};
use ci_gatekeeper_developer_platforms::{CheckProvider, PullRequestProvider};
use tracing::{info, instrument, warn};

use crate::config::GateScope;
use crate::errors::GatekeeperError;
use crate::notifications::render_merge_acknowledgment;
use crate::outcomes::Denial;
use crate::providers::ProviderRegistry;

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;

/// A merge that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedMerge {
    repo_owner: String,
    repo_name: String,
    pr_number: u64,
    method: MergeMethod,
    title: String,
    message: String,
    commenter: String,
    author: String,
}

impl ApprovedMerge {
    pub fn pr_number(&self) -> u64 {
        self.pr_number
    }

    pub fn method(&self) -> MergeMethod {
        self.method
    }

    pub fn request(&self) -> MergeRequest {
        MergeRequest {
            method: self.method,
            title: self.title.clone(),
            message: self.message.clone(),
        }
    }
}

/// The result of the merge gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Approved(ApprovedMerge),
    Denied(Denial),
}

/// Checks a pull request and the check suites of its head commit against the gate.
///
/// With [`GateScope::AllowListed`] only suites of recognised providers are taken
/// into account, otherwise every suite counts.
pub fn check_merge_gate(
    pr: &PullRequest,
    suites: &[CheckSuite],
    registry: &ProviderRegistry,
    scope: GateScope,
) -> Result<(), Denial> {
    if pr.mergeable != Some(true) {
        return Err(Denial::NotMergeable);
    }

    let in_scope: Vec<&CheckSuite> = suites
        .iter()
        .filter(|s| scope == GateScope::All || registry.recognizes(&s.app_slug))
        .collect();

    if in_scope.iter().any(|s| s.status != CheckStatus::Completed) {
        return Err(Denial::ChecksIncomplete);
    }

    let passed = |s: &&CheckSuite| {
        matches!(
            s.conclusion,
            Some(CheckConclusion::Success) | Some(CheckConclusion::Skipped)
        )
    };
    if !in_scope.iter().all(passed) {
        return Err(Denial::ChecksFailed);
    }

    Ok(())
}

/// Runs the merge gate for a pull request.
///
/// # Arguments
///
/// * `provider` - The Git provider implementation
/// * `registry` - The recognised CI providers
/// * `scope` - Which check suites the gate considers
/// * `repo_owner` - The owner of the repository
/// * `repo_name` - The name of the repository
/// * `pr_number` - The pull request to merge
/// * `method` - The merge strategy requested
/// * `commenter` - The login of the user who asked for the merge
///
/// # Errors
///
/// Returns [`GatekeeperError::UpstreamFailure`] when the pull request or its check
/// suites can't be fetched.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(provider, registry))]
pub async fn evaluate_merge_gate<P: PullRequestProvider + CheckProvider + ?Sized>(
    provider: &P,
    registry: &ProviderRegistry,
    scope: GateScope,
    repo_owner: &str,
    repo_name: &str,
    pr_number: u64,
    method: MergeMethod,
    commenter: &str,
) -> Result<GateDecision, GatekeeperError> {
    let pr = provider
        .get_pull_request(repo_owner, repo_name, pr_number)
        .await?;

    // Mergeability is checked before the suites are fetched
    if pr.mergeable != Some(true) {
        info!(
            pull_request = pr_number,
            mergeable = ?pr.mergeable,
            "Pull request is not mergeable"
        );
        return Ok(GateDecision::Denied(Denial::NotMergeable));
    }

    let suites = provider
        .list_check_suites(repo_owner, repo_name, &pr.head_sha)
        .await?;

    if let Err(denial) = check_merge_gate(&pr, &suites, registry, scope) {
        info!(
            pull_request = pr_number,
            head_sha = pr.head_sha.as_str(),
            denial = ?denial,
            "Merge gate denied the merge"
        );
        return Ok(GateDecision::Denied(denial));
    }

    let author = pr
        .author
        .as_ref()
        .map(|u| u.login.clone())
        .unwrap_or_default();

    Ok(GateDecision::Approved(ApprovedMerge {
        repo_owner: repo_owner.to_string(),
        repo_name: repo_name.to_string(),
        pr_number,
        method,
        title: format!("Merge pull request #{} from {}", pr.number, pr.head_ref),
        message: pr.title,
        commenter: commenter.to_string(),
        author,
    }))
}

/// Merges an approved pull request and thanks the people involved.
///
/// # Returns
///
/// The SHA of the merge commit, when the platform reports one.
///
/// # Errors
///
/// Returns [`GatekeeperError::UpstreamFailure`] when the merge is rejected or a
/// call fails. The acknowledgment isn't posted in that case.
#[instrument(skip(provider, approved), fields(pull_request = approved.pr_number))]
pub async fn execute_merge<P: PullRequestProvider + ?Sized>(
    provider: &P,
    approved: ApprovedMerge,
) -> Result<Option<String>, GatekeeperError> {
    let result = provider
        .merge_pull_request(
            &approved.repo_owner,
            &approved.repo_name,
            approved.pr_number,
            &approved.request(),
        )
        .await?;

    if !result.merged {
        warn!(
            pull_request = approved.pr_number,
            message = result.message.as_str(),
            "Platform declined the merge"
        );
        return Err(GatekeeperError::UpstreamFailure(result.message));
    }

    info!(
        repository_owner = approved.repo_owner.as_str(),
        repository = approved.repo_name.as_str(),
        pull_request = approved.pr_number,
        method = approved.method.as_str(),
        "Merged pull request"
    );

    let acknowledgment =
        render_merge_acknowledgment(&approved.commenter, &approved.author, approved.method);
    provider
        .add_comment(
            &approved.repo_owner,
            &approved.repo_name,
            approved.pr_number,
            &acknowledgment,
        )
        .await?;

    Ok(result.sha)
}
