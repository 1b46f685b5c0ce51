//! # Labels
//!
//! Keeps the CI status label of a pull request in line with the latest verdict.
//!
//! A pull request carries at most one label owned by the gatekeeper. Every label
//! starting with the configured prefix is owned, as is every configured status
//! label. Synchronising swaps all owned labels for the one label that represents
//! the verdict.
//!
//! Two strategies are available, selected by [`LabelSyncMode`]:
//!
//! - **Replace**: a single call that sets the complete label set
//! - **Sequential**: removes owned labels one at a time and then adds the new one.
//!   A label that is already gone counts as removed, so a repeated or interrupted
//!   run converges to the same end state.

use ci_gatekeeper_developer_platforms::errors::Error as PlatformError;
use ci_gatekeeper_developer_platforms::models::Label;
use ci_gatekeeper_developer_platforms::PullRequestProvider;
use tracing::{debug, info, instrument};

use crate::aggregate::Verdict;
use crate::config::{LabelSyncMode, LabelsConfig};
use crate::errors::GatekeeperError;

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;

/// Maps verdicts to status labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPolicy {
    config: LabelsConfig,
}

impl LabelPolicy {
    pub fn new(config: LabelsConfig) -> Self {
        Self { config }
    }

    /// The label for a verdict, `None` while the checks are pending.
    ///
    /// # Examples
    ///
    /// ```
    /// use ci_gatekeeper_core::aggregate::Verdict;
    /// use ci_gatekeeper_core::config::LabelsConfig;
    /// use ci_gatekeeper_core::labels::LabelPolicy;
    ///
    /// let policy = LabelPolicy::new(LabelsConfig::default());
    /// assert_eq!(policy.label_for(Verdict::Cancelled), Some("ci/failure"));
    /// assert_eq!(policy.label_for(Verdict::Pending), None);
    /// ```
    pub fn label_for(&self, verdict: Verdict) -> Option<&str> {
        match verdict {
            Verdict::Pending => None,
            Verdict::Success => Some(self.config.success.as_str()),
            Verdict::Failure => Some(self.config.failure.as_str()),
            Verdict::Cancelled => Some(
                self.config
                    .cancelled
                    .as_deref()
                    .unwrap_or(self.config.failure.as_str()),
            ),
        }
    }

    /// Whether a label is managed by the gatekeeper.
    pub fn owns(&self, label: &str) -> bool {
        label.starts_with(&self.config.prefix)
            || label == self.config.success
            || label == self.config.failure
            || self.config.cancelled.as_deref() == Some(label)
    }

    pub fn mode(&self) -> LabelSyncMode {
        self.config.mode
    }
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self::new(LabelsConfig::default())
    }
}

/// Replaces the status labels of an issue or pull request with the label for
/// `verdict`.
///
/// Nothing is changed for a pending verdict, or when the current labels already
/// hold exactly the right status label.
///
/// # Arguments
///
/// * `provider` - The Git provider implementation
/// * `policy` - Label names and synchronisation mode
/// * `repo_owner` - The owner of the repository
/// * `repo_name` - The name of the repository
/// * `pr_number` - The issue or pull request number
/// * `current` - The labels currently applied
/// * `verdict` - The aggregate verdict to represent
///
/// # Returns
///
/// The status label that is applied afterwards, if any.
///
/// # Errors
///
/// Returns [`GatekeeperError::UpstreamFailure`] when a label call fails for any
/// reason other than removing a label that is already gone.
#[instrument(skip(provider, policy, current))]
pub async fn synchronize_ci_label<P: PullRequestProvider + ?Sized>(
    provider: &P,
    policy: &LabelPolicy,
    repo_owner: &str,
    repo_name: &str,
    pr_number: u64,
    current: &[Label],
    verdict: Verdict,
) -> Result<Option<String>, GatekeeperError> {
    let Some(target) = policy.label_for(verdict) else {
        debug!(pull_request = pr_number, "Checks pending, leaving labels alone");
        return Ok(None);
    };

    let owned: Vec<&str> = current
        .iter()
        .map(|l| l.name.as_str())
        .filter(|name| policy.owns(name))
        .collect();

    if owned == [target] {
        debug!(
            pull_request = pr_number,
            label = target,
            "Status label already up to date"
        );
        return Ok(Some(target.to_string()));
    }

    match policy.mode() {
        LabelSyncMode::Replace => {
            let mut labels: Vec<String> = current
                .iter()
                .filter(|l| !policy.owns(&l.name))
                .map(|l| l.name.clone())
                .collect();
            labels.push(target.to_string());

            provider
                .replace_labels(repo_owner, repo_name, pr_number, &labels)
                .await?;
        }
        LabelSyncMode::Sequential => {
            for name in owned {
                match provider
                    .remove_label(repo_owner, repo_name, pr_number, name)
                    .await
                {
                    Ok(()) => debug!(pull_request = pr_number, label = name, "Removed label"),
                    Err(PlatformError::NotFound(_)) => {
                        debug!(pull_request = pr_number, label = name, "Label already removed")
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            provider
                .add_labels(repo_owner, repo_name, pr_number, &[target.to_string()])
                .await?;
        }
    }

    info!(
        repository_owner = repo_owner,
        repository = repo_name,
        pull_request = pr_number,
        label = target,
        "Applied status label for verdict {}",
        verdict
    );
    Ok(Some(target.to_string()))
}
