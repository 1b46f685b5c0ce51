//! In-memory platform used by the unit tests of this crate.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use ci_gatekeeper_developer_platforms::errors::Error;
use ci_gatekeeper_developer_platforms::models::{
    CheckConclusion, CheckRun, CheckRunOutput, CheckStatus, CheckSuite, IssueState, IssueSummary,
    Label, MergeRequest, MergeResult, PullRequest, User,
};
use ci_gatekeeper_developer_platforms::{CheckProvider, ProviderAdapter, PullRequestProvider};

pub const OWNER: &str = "hashgraph";
pub const REPO: &str = "widgets";
pub const HEAD_SHA: &str = "0a1b2c3d";

#[derive(Debug, Default)]
struct State {
    suites: Vec<CheckSuite>,
    runs: HashMap<u64, Vec<CheckRun>>,
    pull_requests: HashMap<u64, PullRequest>,
    search_results: Vec<IssueSummary>,
    labels: HashMap<u64, Vec<String>>,
    comments: Vec<(u64, String)>,
    state_changes: Vec<(u64, IssueState)>,
    merges: Vec<(u64, MergeRequest)>,
    calls: Vec<String>,
    failing: HashSet<&'static str>,
}

/// A platform whose data is set up front and whose writes are recorded.
#[derive(Debug, Default, Clone)]
pub struct MockPlatform {
    state: Arc<Mutex<State>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suite(self, suite: CheckSuite, runs: Vec<CheckRun>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.runs.insert(suite.id, runs);
            state.suites.push(suite);
        }
        self
    }

    pub fn with_pull_request(self, pr: PullRequest) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.labels.insert(
                pr.number,
                pr.labels.iter().map(|l| l.name.clone()).collect(),
            );
            state.pull_requests.insert(pr.number, pr);
        }
        self
    }

    pub fn with_search_result(self, item: IssueSummary) -> Self {
        self.state.lock().unwrap().search_results.push(item);
        self
    }

    pub fn with_labels(self, number: u64, labels: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .labels
            .insert(number, labels.iter().map(|l| l.to_string()).collect());
        self
    }

    /// Makes the named trait method fail with an API error.
    pub fn failing(self, method: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(method);
        self
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    pub fn labels_of(&self, number: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .labels
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn state_changes(&self) -> Vec<(u64, IssueState)> {
        self.state.lock().unwrap().state_changes.clone()
    }

    pub fn merges(&self) -> Vec<(u64, MergeRequest)> {
        self.state.lock().unwrap().merges.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, method: &'static str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method.to_string());
        if state.failing.contains(method) {
            return Err(Error::ApiError(format!("{method} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckProvider for MockPlatform {
    async fn list_check_suites(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        git_ref: &str,
    ) -> Result<Vec<CheckSuite>, Error> {
        self.record("list_check_suites")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .suites
            .iter()
            .filter(|s| s.head_sha == git_ref)
            .cloned()
            .collect())
    }

    async fn list_check_runs(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        check_suite_id: u64,
    ) -> Result<Vec<CheckRun>, Error> {
        self.record("list_check_runs")?;
        let state = self.state.lock().unwrap();
        Ok(state.runs.get(&check_suite_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PullRequestProvider for MockPlatform {
    async fn get_pull_request(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error> {
        self.record("get_pull_request")?;
        let state = self.state.lock().unwrap();
        let mut pr = state
            .pull_requests
            .get(&pr_number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("pull request {pr_number}")))?;
        pr.labels = state
            .labels
            .get(&pr_number)
            .map(|names| {
                names
                    .iter()
                    .map(|n| Label { name: n.clone() })
                    .collect()
            })
            .unwrap_or_default();
        Ok(pr)
    }

    async fn add_comment(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        comment: &str,
    ) -> Result<(), Error> {
        self.record("add_comment")?;
        self.state
            .lock()
            .unwrap()
            .comments
            .push((pr_number, comment.to_string()));
        Ok(())
    }

    async fn list_labels(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error> {
        self.record("list_labels")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .labels
            .get(&pr_number)
            .map(|names| {
                names
                    .iter()
                    .map(|n| Label { name: n.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_labels(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<(), Error> {
        self.record("add_labels")?;
        let mut state = self.state.lock().unwrap();
        let current = state.labels.entry(pr_number).or_default();
        for label in labels {
            if !current.contains(label) {
                current.push(label.clone());
            }
        }
        Ok(())
    }

    async fn remove_label(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error> {
        self.record("remove_label")?;
        let mut state = self.state.lock().unwrap();
        let current = state.labels.entry(pr_number).or_default();
        match current.iter().position(|l| l == label) {
            Some(index) => {
                current.remove(index);
                Ok(())
            }
            None => Err(Error::NotFound(format!("label {label}"))),
        }
    }

    async fn replace_labels(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<(), Error> {
        self.record("replace_labels")?;
        self.state
            .lock()
            .unwrap()
            .labels
            .insert(pr_number, labels.to_vec());
        Ok(())
    }

    async fn update_issue_state(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        state: IssueState,
    ) -> Result<(), Error> {
        self.record("update_issue_state")?;
        self.state
            .lock()
            .unwrap()
            .state_changes
            .push((pr_number, state));
        Ok(())
    }

    async fn merge_pull_request(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        request: &MergeRequest,
    ) -> Result<MergeResult, Error> {
        self.record("merge_pull_request")?;
        self.state
            .lock()
            .unwrap()
            .merges
            .push((pr_number, request.clone()));
        Ok(MergeResult {
            sha: Some(format!("merged{pr_number}")),
            merged: true,
            message: "Pull Request successfully merged".to_string(),
        })
    }

    async fn search_issues_by_commit(&self, _sha: &str) -> Result<Vec<IssueSummary>, Error> {
        self.record("search_issues_by_commit")?;
        Ok(self.state.lock().unwrap().search_results.clone())
    }
}

/// A task lookup adapter backed by a fixed map.
#[derive(Debug, Default)]
pub struct MockAdapter {
    pub slug: String,
    pub tasks: HashMap<String, u64>,
    pub lookups: Mutex<Vec<String>>,
}

impl MockAdapter {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            ..Default::default()
        }
    }

    pub fn with_task(mut self, task_id: &str, pr_number: u64) -> Self {
        self.tasks.insert(task_id.to_string(), pr_number);
        self
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn provider_slug(&self) -> &str {
        &self.slug
    }

    async fn find_pull_request(&self, external_task_id: &str) -> Result<Option<u64>, Error> {
        self.lookups
            .lock()
            .unwrap()
            .push(external_task_id.to_string());
        Ok(self.tasks.get(external_task_id).copied())
    }
}

pub fn user(id: u64, login: &str) -> User {
    User {
        id,
        login: login.to_string(),
    }
}

pub fn suite(id: u64, slug: &str, conclusion: Option<CheckConclusion>) -> CheckSuite {
    CheckSuite {
        id,
        app_slug: slug.to_string(),
        status: CheckStatus::Completed,
        conclusion,
        head_sha: HEAD_SHA.to_string(),
    }
}

pub fn running_suite(id: u64, slug: &str) -> CheckSuite {
    CheckSuite {
        status: CheckStatus::InProgress,
        conclusion: None,
        ..suite(id, slug, None)
    }
}

pub fn run(id: u64, name: &str, conclusion: CheckConclusion) -> CheckRun {
    CheckRun {
        id,
        name: name.to_string(),
        status: CheckStatus::Completed,
        conclusion: Some(conclusion),
        details_url: Some(format!("https://ci.example.com/task/{id}")),
        external_id: Some(id.to_string()),
        output: CheckRunOutput::default(),
    }
}

pub fn pull_request(number: u64, mergeable: Option<bool>) -> PullRequest {
    PullRequest {
        number,
        title: format!("Add feature {number}"),
        state: IssueState::Open,
        draft: false,
        head_sha: HEAD_SHA.to_string(),
        head_ref: format!("feature/{number}"),
        mergeable,
        author: Some(user(100, "alice")),
        labels: Vec::new(),
    }
}

pub fn search_item(owner: &str, repo: &str, number: u64, state: IssueState) -> IssueSummary {
    IssueSummary {
        number,
        state,
        html_url: format!("https://github.com/{owner}/{repo}/pull/{number}"),
        labels: Vec::new(),
        user: user(100, "alice"),
    }
}
