//! Results of processing one event.

use crate::aggregate::Verdict;
use crate::commands::Instruction;

#[cfg(test)]
#[path = "outcomes_tests.rs"]
mod tests;

/// Whether a refusal is about who asked or about the state of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialCategory {
    PermissionDenied,
    PreconditionFailed,
}

/// Why an instruction was refused. Each denial is reported with its own comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The commenter isn't allowed to issue the instruction
    PermissionDenied {
        login: String,
        instruction: Instruction,
    },

    /// The issue or pull request isn't open
    AlreadyClosed { instruction: Instruction },

    /// A merge instruction was posted on a plain issue
    NotPullRequest { instruction: Instruction },

    /// The branch conflicts with its base, or mergeability is still being computed
    NotMergeable,

    /// At least one check suite of the head commit is still running
    ChecksIncomplete,

    /// At least one check suite concluded with something other than success or skipped
    ChecksFailed,
}

impl Denial {
    pub fn category(&self) -> DenialCategory {
        match self {
            Denial::PermissionDenied { .. } => DenialCategory::PermissionDenied,
            Denial::AlreadyClosed { .. }
            | Denial::NotPullRequest { .. }
            | Denial::NotMergeable
            | Denial::ChecksIncomplete
            | Denial::ChecksFailed => DenialCategory::PreconditionFailed,
        }
    }
}

/// What happened to an instruction comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The comment isn't an instruction
    Ignored,

    Closed,

    Merged {
        sha: Option<String>,
    },

    Denied(Denial),
}

/// What happened after a check suite completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSuiteOutcome {
    pub verdict: Verdict,

    /// Pull requests that were notified and labelled
    pub pull_requests: Vec<u64>,
}
