//! Typed references to issues and pull requests.
//!
//! Search results only identify the repository through their web link, so the
//! link is parsed instead of split on `/` at a fixed offset.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::GatekeeperError;

#[cfg(test)]
#[path = "references_tests.rs"]
mod tests;

lazy_static! {
    static ref ISSUE_URL: Regex =
        Regex::new(r"^https?://[^/\s]+/([^/\s]+)/([^/\s]+)/(pull|issues)/(\d+)/?$")
            .expect("Issue URL pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Issue,
    Pull,
}

/// Identifies one issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueReference {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub kind: ReferenceKind,
}

impl IssueReference {
    pub fn pull(owner: &str, repo: &str, number: u64) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            kind: ReferenceKind::Pull,
        }
    }

    /// Parses a web link such as `https://github.com/owner/repo/pull/12`.
    ///
    /// # Errors
    ///
    /// Returns [`GatekeeperError::InvalidReference`] when the link doesn't point at
    /// an issue or pull request.
    ///
    /// # Examples
    ///
    /// ```
    /// use ci_gatekeeper_core::references::{IssueReference, ReferenceKind};
    ///
    /// let reference = IssueReference::parse("https://github.com/octo/widgets/pull/12").unwrap();
    /// assert_eq!(reference.number, 12);
    /// assert_eq!(reference.kind, ReferenceKind::Pull);
    /// ```
    pub fn parse(html_url: &str) -> Result<Self, GatekeeperError> {
        let captures = ISSUE_URL
            .captures(html_url)
            .ok_or_else(|| GatekeeperError::InvalidReference(html_url.to_string()))?;

        let number = captures[4]
            .parse::<u64>()
            .map_err(|_| GatekeeperError::InvalidReference(html_url.to_string()))?;

        let kind = match &captures[3] {
            "pull" => ReferenceKind::Pull,
            _ => ReferenceKind::Issue,
        };

        Ok(Self {
            owner: captures[1].to_string(),
            repo: captures[2].to_string(),
            number,
            kind,
        })
    }

    /// Whether the reference belongs to the given repository.
    ///
    /// Owner and repository names on GitHub are case-insensitive.
    pub fn is_in(&self, owner: &str, repo: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner) && self.repo.eq_ignore_ascii_case(repo)
    }

    pub fn is_pull_request(&self) -> bool {
        self.kind == ReferenceKind::Pull
    }
}

impl std::fmt::Display for IssueReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}
