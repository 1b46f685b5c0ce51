//! # Events
//!
//! Typed webhook payloads for the two events the gatekeeper handles. Only the
//! fields that are used are modelled; everything else in the payload is ignored.

use ci_gatekeeper_developer_platforms::models::{
    AuthorAssociation, CheckConclusion, CheckStatus, IssueState, User,
};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSuiteAction {
    Completed,
    Requested,
    Rerequested,

    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    Created,
    Edited,
    Deleted,

    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuitePayload {
    pub id: u64,
    pub head_sha: String,
    pub status: CheckStatus,

    #[serde(default)]
    pub conclusion: Option<CheckConclusion>,

    pub app: App,
}

/// A `check_suite` webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuiteEvent {
    pub action: CheckSuiteAction,
    pub check_suite: CheckSuitePayload,
    pub repository: Repository,

    #[serde(default)]
    pub installation: Option<Installation>,
}

/// Present on the issue of a comment when the issue is a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestLink {
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePayload {
    pub number: u64,
    pub state: IssueState,
    pub user: User,

    #[serde(default)]
    pub pull_request: Option<PullRequestLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPayload {
    pub id: u64,
    pub body: String,
    pub user: User,
    pub author_association: AuthorAssociation,
}

/// An `issue_comment` webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    pub action: CommentAction,
    pub issue: IssuePayload,
    pub comment: CommentPayload,
    pub repository: Repository,

    #[serde(default)]
    pub installation: Option<Installation>,
}

impl CheckSuiteEvent {
    pub fn installation_id(&self) -> Option<u64> {
        self.installation.as_ref().map(|i| i.id)
    }
}

impl IssueCommentEvent {
    pub fn installation_id(&self) -> Option<u64> {
        self.installation.as_ref().map(|i| i.id)
    }
}
