//! # Status Aggregation
//!
//! Reduces the check suites of one commit to a single [`Verdict`].
//!
//! The reduction ranks every suite conclusion as failure, cancelled or success and
//! keeps the highest rank, so the result doesn't depend on the order in which the
//! suites were listed. Failing runs are sorted for the same reason.

use ci_gatekeeper_developer_platforms::models::{CheckConclusion, CheckRun, CheckStatus};
use serde::{Deserialize, Serialize};

use crate::collector::SuiteResult;

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;

/// The aggregate outcome of all recognised check suites for a commit.
///
/// Variants are ordered by precedence: a failure outranks a cancellation, which
/// outranks a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pending,
    Success,
    Cancelled,
    Failure,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pending => "pending",
            Verdict::Success => "success",
            Verdict::Cancelled => "cancelled",
            Verdict::Failure => "failure",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict together with the runs that caused a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateVerdict {
    pub verdict: Verdict,

    /// Failing check runs, sorted by name. Empty unless the verdict is a failure.
    pub failing_runs: Vec<CheckRun>,
}

impl AggregateVerdict {
    pub fn pending() -> Self {
        Self {
            verdict: Verdict::Pending,
            failing_runs: Vec::new(),
        }
    }
}

/// Maps a conclusion onto the verdict it contributes.
///
/// Conclusions this crate doesn't know are treated as failures.
pub fn classify(conclusion: CheckConclusion) -> Verdict {
    match conclusion {
        CheckConclusion::Success | CheckConclusion::Skipped | CheckConclusion::Neutral => {
            Verdict::Success
        }
        CheckConclusion::Cancelled | CheckConclusion::Stale => Verdict::Cancelled,
        CheckConclusion::Failure
        | CheckConclusion::TimedOut
        | CheckConclusion::StartupFailure
        | CheckConclusion::ActionRequired
        | CheckConclusion::Unknown => Verdict::Failure,
    }
}

fn is_failing(run: &CheckRun) -> bool {
    run.conclusion
        .map(|c| classify(c) == Verdict::Failure)
        .unwrap_or(false)
}

/// Reduces a set of check suite results to one verdict.
///
/// An empty set aggregates to success. If any suite or run hasn't completed the
/// verdict is [`Verdict::Pending`].
///
/// # Examples
///
/// ```
/// use ci_gatekeeper_core::aggregate::{aggregate, Verdict};
///
/// assert_eq!(aggregate(&[]).verdict, Verdict::Success);
/// ```
pub fn aggregate(results: &[SuiteResult]) -> AggregateVerdict {
    let incomplete = results.iter().any(|r| {
        !r.provider.completed(&r.suite)
            || r.runs.iter().any(|run| run.status != CheckStatus::Completed)
    });
    if incomplete {
        return AggregateVerdict::pending();
    }

    let verdict = results
        .iter()
        .filter_map(|r| r.provider.conclusion(&r.suite))
        .map(classify)
        .max()
        .unwrap_or(Verdict::Success);

    let mut failing_runs = Vec::new();
    if verdict == Verdict::Failure {
        failing_runs = results
            .iter()
            .flat_map(|r| r.runs.iter())
            .filter(|run| is_failing(run))
            .cloned()
            .collect();
        failing_runs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    }

    AggregateVerdict {
        verdict,
        failing_runs,
    }
}
