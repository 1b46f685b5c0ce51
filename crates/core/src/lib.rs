//! # CI Gatekeeper Core
//!
//! Core logic for reporting CI results on pull requests and for gatekeeping the
//! instructions maintainers post as comments.
//!
//! Two events drive the gatekeeper:
//!
//! - **Check suite completed**: the check suites of the commit are collected and
//!   reduced to one verdict, the open pull requests of the commit are resolved,
//!   and each of them receives a comment and a status label.
//! - **Comment created**: `/close`, `/merge`, `/squash-and-merge` and
//!   `/rebase-and-merge` are authorised and carried out. Merges pass the merge
//!   gate first.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ci_gatekeeper_core::events::CheckSuiteEvent;
//! use ci_gatekeeper_core::Gatekeeper;
//! use ci_gatekeeper_developer_platforms::{CheckProvider, PullRequestProvider};
//!
//! async fn report<P>(provider: P, event: CheckSuiteEvent)
//! where
//!     P: PullRequestProvider + CheckProvider + std::fmt::Debug,
//! {
//!     let gatekeeper = Gatekeeper::new(provider);
//!
//!     match gatekeeper.process_check_suite(&event).await {
//!         Ok(outcome) => println!("Reported {} on {:?}", outcome.verdict, outcome.pull_requests),
//!         Err(e) if e.is_silent() => {}
//!         Err(e) => eprintln!("Failed to report CI results: {e}"),
//!     }
//! }
//! ```

use std::sync::Arc;

use ci_gatekeeper_developer_platforms::models::IssueState;
use ci_gatekeeper_developer_platforms::{CheckProvider, ProviderAdapter, PullRequestProvider};
use tracing::{debug, info, instrument};

pub mod aggregate;
use aggregate::{aggregate, Verdict};

pub mod collector;
use collector::collect_check_results;

pub mod commands;
use commands::{evaluate, CommentContext, Dispatch};

pub mod config;
use config::GatekeeperConfig;

pub mod errors;
use errors::GatekeeperError;

pub mod events;
use events::{CheckSuiteAction, CheckSuiteEvent, CommentAction, IssueCommentEvent};

pub mod labels;
use labels::{synchronize_ci_label, LabelPolicy};

pub mod merge;
use merge::{evaluate_merge_gate, execute_merge, GateDecision};

pub mod notifications;
use notifications::{render_denial, render_verdict};

pub mod outcomes;
use outcomes::{CheckSuiteOutcome, CommandOutcome, Denial};

pub mod providers;
use providers::ProviderRegistry;

pub mod references;
use references::IssueReference;

pub mod resolver;
use resolver::resolve_pull_requests;

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Reports CI results on pull requests and carries out maintainer instructions.
///
/// Each call handles one event on its own. All state lives with the provider; the
/// gatekeeper only holds configuration.
#[derive(Debug)]
pub struct Gatekeeper<P: PullRequestProvider + CheckProvider + std::fmt::Debug> {
    provider: P,
    config: GatekeeperConfig,
    registry: ProviderRegistry,
    labels: LabelPolicy,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl<P: PullRequestProvider + CheckProvider + std::fmt::Debug> Gatekeeper<P> {
    /// Creates a gatekeeper with the default configuration.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, GatekeeperConfig::default())
    }

    pub fn with_config(provider: P, config: GatekeeperConfig) -> Self {
        Self {
            registry: ProviderRegistry::from_config(&config.checks),
            labels: LabelPolicy::new(config.labels.clone()),
            provider,
            config,
            adapters: Vec::new(),
        }
    }

    /// Adds a lookup for CI providers that can map their tasks to pull requests.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Handles a completed check suite.
    ///
    /// Comments on and labels every open pull request of the repository that the
    /// commit belongs to.
    ///
    /// # Errors
    ///
    /// * [`GatekeeperError::NotReady`] while any recognised suite or run is running
    /// * [`GatekeeperError::NotFound`] when the suite comes from an unrecognised
    ///   provider, or there is nothing to report or nobody to report it to
    /// * [`GatekeeperError::UpstreamFailure`] when a provider call fails; the
    ///   remaining steps are skipped
    #[instrument(
        skip(self, event),
        fields(
            repository_owner = event.repository.owner.login.as_str(),
            repository = event.repository.name.as_str(),
            head_sha = event.check_suite.head_sha.as_str(),
        )
    )]
    pub async fn process_check_suite(
        &self,
        event: &CheckSuiteEvent,
    ) -> Result<CheckSuiteOutcome, GatekeeperError> {
        if event.action != CheckSuiteAction::Completed {
            return Err(GatekeeperError::NotFound(format!(
                "nothing to do for check suite action {:?}",
                event.action
            )));
        }

        let slug = event.check_suite.app.slug.as_str();
        if !self.registry.recognizes(slug) {
            debug!(app = slug, "Ignoring check suite from an unrecognised provider");
            return Err(GatekeeperError::NotFound(format!(
                "check suite from unrecognised provider {slug}"
            )));
        }

        let owner = event.repository.owner.login.as_str();
        let repo = event.repository.name.as_str();
        let head_sha = event.check_suite.head_sha.as_str();

        let results =
            collect_check_results(&self.provider, &self.registry, owner, repo, head_sha).await?;
        if results.is_empty() {
            return Err(GatekeeperError::NotFound(format!(
                "no check suites from recognised providers for {head_sha}"
            )));
        }

        let aggregated = aggregate(&results);
        if aggregated.verdict == Verdict::Pending {
            return Err(GatekeeperError::NotReady);
        }

        let pull_requests = resolve_pull_requests(
            &self.provider,
            &self.adapters,
            &results,
            owner,
            repo,
            head_sha,
        )
        .await?;
        if pull_requests.is_empty() {
            return Err(GatekeeperError::NotFound(format!(
                "no open pull request in {owner}/{repo} for {head_sha}"
            )));
        }

        let mut notified = Vec::with_capacity(pull_requests.len());
        for pr in &pull_requests {
            let author = pr.author_login().unwrap_or_default();
            if let Some(body) = render_verdict(aggregated.verdict, author, &aggregated.failing_runs)
            {
                self.provider
                    .add_comment(owner, repo, pr.number(), &body)
                    .await?;
            }

            // Search results lag behind label changes
            let current = self
                .provider
                .list_labels(owner, repo, pr.number())
                .await?;
            synchronize_ci_label(
                &self.provider,
                &self.labels,
                owner,
                repo,
                pr.number(),
                &current,
                aggregated.verdict,
            )
            .await?;

            notified.push(pr.number());
        }

        info!(
            verdict = aggregated.verdict.as_str(),
            pull_requests = ?notified,
            "Reported CI results"
        );
        Ok(CheckSuiteOutcome {
            verdict: aggregated.verdict,
            pull_requests: notified,
        })
    }

    /// Handles a new comment on an issue or pull request.
    ///
    /// Ordinary comments are ignored. Refused instructions are answered with a
    /// comment that explains the refusal.
    ///
    /// # Errors
    ///
    /// * [`GatekeeperError::InvalidReference`] when the pull request link of the
    ///   issue can't be parsed
    /// * [`GatekeeperError::NotFound`] when the link points at another repository
    /// * [`GatekeeperError::UpstreamFailure`] when a provider call fails
    #[instrument(
        skip(self, event),
        fields(
            repository_owner = event.repository.owner.login.as_str(),
            repository = event.repository.name.as_str(),
            issue = event.issue.number,
        )
    )]
    pub async fn process_comment(
        &self,
        event: &IssueCommentEvent,
    ) -> Result<CommandOutcome, GatekeeperError> {
        if event.action != CommentAction::Created {
            return Ok(CommandOutcome::Ignored);
        }

        let owner = event.repository.owner.login.as_str();
        let repo = event.repository.name.as_str();
        let number = event.issue.number;

        let pull_request = match &event.issue.pull_request {
            Some(link) => {
                let reference = IssueReference::parse(&link.html_url)?;
                if !reference.is_in(owner, repo) {
                    return Err(GatekeeperError::NotFound(format!(
                        "pull request {reference} is not part of {owner}/{repo}"
                    )));
                }
                Some(reference)
            }
            None => None,
        };

        let context = CommentContext {
            body: event.comment.body.clone(),
            commenter: event.comment.user.login.clone(),
            association: event.comment.author_association,
            issue_author: event.issue.user.login.clone(),
            state: event.issue.state,
            pull_request,
        };

        match evaluate(&context) {
            Dispatch::Ignore => Ok(CommandOutcome::Ignored),
            Dispatch::Deny(denial) => self.deny(owner, repo, number, &context, denial).await,
            Dispatch::Close => {
                self.provider
                    .update_issue_state(owner, repo, number, IssueState::Closed)
                    .await?;
                info!(commenter = context.commenter.as_str(), "Closed issue");
                Ok(CommandOutcome::Closed)
            }
            Dispatch::Merge(method) => {
                let decision = evaluate_merge_gate(
                    &self.provider,
                    &self.registry,
                    self.config.merge.gate_scope,
                    owner,
                    repo,
                    number,
                    method,
                    &context.commenter,
                )
                .await?;

                match decision {
                    GateDecision::Approved(approved) => {
                        let sha = execute_merge(&self.provider, approved).await?;
                        Ok(CommandOutcome::Merged { sha })
                    }
                    GateDecision::Denied(denial) => {
                        self.deny(owner, repo, number, &context, denial).await
                    }
                }
            }
        }
    }

    async fn deny(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        context: &CommentContext,
        denial: Denial,
    ) -> Result<CommandOutcome, GatekeeperError> {
        info!(
            commenter = context.commenter.as_str(),
            denial = ?denial,
            category = ?denial.category(),
            "Refused instruction"
        );

        let body = render_denial(&denial, &context.commenter);
        self.provider
            .add_comment(owner, repo, number, &body)
            .await?;

        Ok(CommandOutcome::Denied(denial))
    }
}
