use async_trait::async_trait;

pub mod cirrus;

pub mod errors;

pub mod github;

pub mod models;
use errors::Error;
use models::{
    CheckRun, CheckSuite, IssueState, IssueSummary, Label, MergeRequest, MergeResult,
    PullRequest,
};

/// Trait to fetch configuration files from remote repositories.
#[async_trait]
pub trait ConfigFetcher: Sync + Send {
    /// Fetch the content of a configuration file at the given path.
    /// Returns Ok(Some(content)) if found, Ok(None) if not found, or Err on error.
    async fn fetch_config(
        &self,
        repo_owner: &str,
        repo_name: &str,
        path: &str,
    ) -> Result<Option<String>, Error>;
}

/// Trait for reading CI results that providers attach to commits.
#[async_trait]
pub trait CheckProvider: Sync + Send {
    /// Lists all check suites, from every CI provider, for a commit.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `git_ref` - A commit SHA, branch or tag name
    async fn list_check_suites(
        &self,
        repo_owner: &str,
        repo_name: &str,
        git_ref: &str,
    ) -> Result<Vec<CheckSuite>, Error>;

    /// Lists all check runs belonging to one check suite.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `check_suite_id` - The ID of the check suite
    async fn list_check_runs(
        &self,
        repo_owner: &str,
        repo_name: &str,
        check_suite_id: u64,
    ) -> Result<Vec<CheckRun>, Error>;
}

/// Trait for interacting with developer platforms that host issues and pull
/// requests (e.g., GitHub).
///
/// Implementations provide the issue, label, comment and merge operations the
/// gatekeeper needs to act on CI results and maintainer instructions.
///
/// Issues and pull requests share one number space, so every `pr_number`
/// argument except the one of [`PullRequestProvider::get_pull_request`] and
/// [`PullRequestProvider::merge_pull_request`] may also refer to a plain issue.
#[async_trait]
pub trait PullRequestProvider: Sync + Send {
    /// Retrieves a pull request from the Git provider.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    async fn get_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error>;

    /// Adds a comment to an issue or pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The issue or pull request number
    /// * `comment` - The comment text to add
    async fn add_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        comment: &str,
    ) -> Result<(), Error>;

    /// Lists the labels currently applied to an issue or pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The issue or pull request number
    async fn list_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error>;

    /// Adds labels to an issue or pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The issue or pull request number
    /// * `labels` - The labels to add
    async fn add_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<(), Error>;

    /// Removes a label from an issue or pull request.
    ///
    /// Returns [`Error::NotFound`] when the label isn't applied.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The issue or pull request number
    /// * `label` - The label to remove
    async fn remove_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error>;

    /// Replaces the complete label set of an issue or pull request in a single
    /// call.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The issue or pull request number
    /// * `labels` - The labels that should be applied afterwards
    async fn replace_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<(), Error>;

    /// Opens or closes an issue or pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The issue or pull request number
    /// * `state` - The new state
    async fn update_issue_state(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        state: IssueState,
    ) -> Result<(), Error>;

    /// Merges a pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    /// * `request` - Merge strategy, commit title and commit message
    async fn merge_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        request: &MergeRequest,
    ) -> Result<MergeResult, Error>;

    /// Searches for issues and pull requests that reference a commit.
    ///
    /// The search isn't scoped to a repository; callers must filter the results.
    ///
    /// # Arguments
    ///
    /// * `sha` - The commit SHA to search for
    async fn search_issues_by_commit(&self, sha: &str) -> Result<Vec<IssueSummary>, Error>;
}

/// Maps a provider specific task identifier to the pull request it was built for,
/// using the CI provider's own API.
///
/// Used when the platform search can't link a commit to a pull request.
#[async_trait]
pub trait ProviderAdapter: Sync + Send + std::fmt::Debug {
    /// The app slug of the CI provider this adapter queries, e.g. `cirrus-ci`.
    fn provider_slug(&self) -> &str;

    /// Looks up the pull request number for a task.
    ///
    /// Returns `Ok(None)` when the provider knows the task but it wasn't built for
    /// a pull request.
    async fn find_pull_request(&self, external_task_id: &str) -> Result<Option<u64>, Error>;
}
