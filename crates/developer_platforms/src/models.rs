//! # Models
//!
//! This module contains the data models exchanged with developer platforms and
//! CI providers.
//!
//! These models represent the entities the gatekeeper observes and acts upon:
//! check suites, check runs, pull requests, labels and search results. They are
//! serializable so that they can be read directly from webhook payloads and
//! platform API responses.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Relationship of a user to the repository a comment was made in.
///
/// Mirrors the `author_association` field that GitHub attaches to comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorAssociation {
    Collaborator,
    Contributor,
    FirstTimer,
    FirstTimeContributor,
    Mannequin,
    Member,
    None,
    Owner,

    /// Any association value this crate doesn't know about.
    #[serde(other)]
    Unknown,
}

impl AuthorAssociation {
    /// Returns `true` for associations that carry write access to the repository.
    ///
    /// # Examples
    ///
    /// ```
    /// use ci_gatekeeper_developer_platforms::models::AuthorAssociation;
    ///
    /// assert!(AuthorAssociation::Owner.is_member());
    /// assert!(!AuthorAssociation::Contributor.is_member());
    /// ```
    pub fn is_member(&self) -> bool {
        matches!(
            self,
            AuthorAssociation::Owner | AuthorAssociation::Member | AuthorAssociation::Collaborator
        )
    }
}

/// Completion status of a check suite or check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,

    #[serde(other)]
    Unknown,
}

/// Conclusion reported by a CI provider once a check suite or check run completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Stale,
    StartupFailure,

    #[serde(other)]
    Unknown,
}

/// The output block attached to a check run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunOutput {
    /// Short summary of the result
    #[serde(default)]
    pub summary: Option<String>,

    /// Detailed text of the result, usually Markdown
    #[serde(default)]
    pub text: Option<String>,
}

/// An individual job or test step within a check suite.
///
/// # Examples
///
/// ```
/// use ci_gatekeeper_developer_platforms::models::{CheckConclusion, CheckRun, CheckRunOutput, CheckStatus};
///
/// let run = CheckRun {
///     id: 7,
///     name: "lint".to_string(),
///     status: CheckStatus::Completed,
///     conclusion: Some(CheckConclusion::Failure),
///     details_url: Some("https://cirrus-ci.com/task/42".to_string()),
///     external_id: Some("42".to_string()),
///     output: CheckRunOutput::default(),
/// };
/// assert_eq!(run.detail_text(), "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    /// The unique identifier of the check run
    pub id: u64,

    /// The name of the check run
    pub name: String,

    /// Whether the check run has finished
    pub status: CheckStatus,

    /// The conclusion, only present once the run completed
    #[serde(default)]
    pub conclusion: Option<CheckConclusion>,

    /// Link to the CI provider page for this run
    #[serde(default)]
    pub details_url: Option<String>,

    /// Provider specific identifier, e.g. the Cirrus CI task id
    #[serde(default)]
    pub external_id: Option<String>,

    /// Result output of the run
    #[serde(default)]
    pub output: CheckRunOutput,
}

impl CheckRun {
    /// Returns the detail text of the run, falling back to the summary when no
    /// text was provided.
    pub fn detail_text(&self) -> &str {
        self.output
            .text
            .as_deref()
            .or(self.output.summary.as_deref())
            .unwrap_or_default()
    }
}

/// A CI provider's top-level run record for one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuite {
    /// The unique identifier of the check suite
    pub id: u64,

    /// The slug of the app that created the suite, e.g. `github-actions`
    pub app_slug: String,

    /// Whether the suite has finished
    pub status: CheckStatus,

    /// The conclusion, only present once the suite completed
    pub conclusion: Option<CheckConclusion>,

    /// The commit the suite ran against
    pub head_sha: String,
}

/// Open or closed state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

/// An issue or pull request as returned by a search.
///
/// Search results don't carry the repository explicitly; the `html_url` is the
/// only reliable indication of where the item lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSummary {
    /// The issue or pull request number
    pub number: u64,

    /// Open or closed
    pub state: IssueState,

    /// Web link to the item, e.g. `https://github.com/owner/repo/pull/12`
    pub html_url: String,

    /// Labels currently applied
    #[serde(default)]
    pub labels: Vec<Label>,

    /// The user that opened the item
    pub user: User,
}

/// Represents a label on an issue or pull request.
///
/// # Examples
///
/// ```
/// use ci_gatekeeper_developer_platforms::models::Label;
///
/// let label = Label {
///     name: "ci/success".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// The name of the label
    pub name: String,
}

/// Strategy used to merge a pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    #[default]
    Merge,
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

/// Parameters of a merge request sent to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// How the branch is merged
    pub method: MergeMethod,

    /// Title of the merge commit
    pub title: String,

    /// Message of the merge commit
    pub message: String,
}

/// Result of a merge as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    /// SHA of the resulting commit
    #[serde(default)]
    pub sha: Option<String>,

    /// Whether the merge took place
    pub merged: bool,

    /// Platform provided message
    #[serde(default)]
    pub message: String,
}

/// Represents a pull request from a Git provider.
///
/// # Examples
///
/// ```
/// use ci_gatekeeper_developer_platforms::models::{IssueState, PullRequest, User};
///
/// let pr = PullRequest {
///     number: 123,
///     title: "feat(storage): add page cache".to_string(),
///     state: IssueState::Open,
///     draft: false,
///     head_sha: "0123abc".to_string(),
///     head_ref: "feature/page-cache".to_string(),
///     mergeable: Some(true),
///     author: Some(User { id: 1, login: "octocat".to_string() }),
///     labels: Vec::new(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// The pull request number
    pub number: u64,

    /// The title of the pull request
    pub title: String,

    /// Open or closed
    pub state: IssueState,

    /// Whether the pull request is a draft
    pub draft: bool,

    /// The commit at the tip of the source branch
    pub head_sha: String,

    /// The name of the source branch
    pub head_ref: String,

    /// Whether the branch can be merged without conflicts. `None` while the
    /// platform is still computing it.
    pub mergeable: Option<bool>,

    /// The user that opened the pull request
    pub author: Option<User>,

    /// Labels currently applied
    pub labels: Vec<Label>,
}

/// A user on the developer platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The unique identifier of the user
    pub id: u64,

    /// The login handle of the user
    pub login: String,
}
