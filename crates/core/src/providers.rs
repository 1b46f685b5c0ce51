//! # CI Providers
//!
//! Describes the CI integrations whose check suites take part in aggregation.
//!
//! Every recognised provider is a [`CiProvider`] variant. Aggregation and
//! collection only ask a provider whether it recognises a suite, whether the suite
//! completed, and what it concluded; nothing else in the crate matches on app
//! slugs.

use ci_gatekeeper_developer_platforms::models::{CheckConclusion, CheckStatus, CheckSuite};

use crate::config::ChecksConfig;

#[cfg(test)]
#[path = "providers_tests.rs"]
mod tests;

const CIRRUS_CI_SLUG: &str = "cirrus-ci";
const GITHUB_ACTIONS_SLUG: &str = "github-actions";

/// A CI integration that reports check suites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiProvider {
    CirrusCi,
    GitHubActions,

    /// Any other app, identified by its slug
    Custom(String),
}

impl CiProvider {
    /// Creates the provider for an app slug.
    pub fn from_slug(slug: &str) -> Self {
        match slug {
            CIRRUS_CI_SLUG => CiProvider::CirrusCi,
            GITHUB_ACTIONS_SLUG => CiProvider::GitHubActions,
            other => CiProvider::Custom(other.to_string()),
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            CiProvider::CirrusCi => CIRRUS_CI_SLUG,
            CiProvider::GitHubActions => GITHUB_ACTIONS_SLUG,
            CiProvider::Custom(slug) => slug.as_str(),
        }
    }

    pub fn recognizes(&self, slug: &str) -> bool {
        self.slug() == slug
    }

    pub fn completed(&self, suite: &CheckSuite) -> bool {
        suite.status == CheckStatus::Completed
    }

    /// The conclusion of a completed suite, `None` while it is still running.
    pub fn conclusion(&self, suite: &CheckSuite) -> Option<CheckConclusion> {
        if !self.completed(suite) {
            return None;
        }

        Some(suite.conclusion.unwrap_or(CheckConclusion::Unknown))
    }

    /// Whether the provider exposes an API that maps its task ids to pull requests.
    pub fn supports_task_lookup(&self) -> bool {
        matches!(self, CiProvider::CirrusCi)
    }
}

/// The allow-list of CI providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistry {
    providers: Vec<CiProvider>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<CiProvider>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &ChecksConfig) -> Self {
        Self::new(config.providers.iter().map(|s| CiProvider::from_slug(s)).collect())
    }

    /// Finds the provider that reported a suite, if it is on the allow-list.
    pub fn find(&self, slug: &str) -> Option<&CiProvider> {
        self.providers.iter().find(|p| p.recognizes(slug))
    }

    pub fn recognizes(&self, slug: &str) -> bool {
        self.find(slug).is_some()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::from_config(&ChecksConfig::default())
    }
}
