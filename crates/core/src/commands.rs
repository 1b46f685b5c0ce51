//! # Instructions
//!
//! Maintainers steer the gatekeeper with comments that consist of a single
//! instruction:
//!
//! | Instruction          | Effect                              | Allowed for            |
//! |----------------------|-------------------------------------|------------------------|
//! | `/close`             | closes the issue or pull request    | members and the author |
//! | `/merge`             | merges the pull request             | members                |
//! | `/squash-and-merge`  | squashes and merges                 | members                |
//! | `/rebase-and-merge`  | rebases and merges                  | members                |
//!
//! Members are users whose association with the repository is `OWNER`, `MEMBER`
//! or `COLLABORATOR`. Any other comment is ordinary discussion and is ignored.
//!
//! Evaluating a comment is a pure step that yields a [`Dispatch`]; carrying it out
//! is done by [`crate::Gatekeeper`].

use ci_gatekeeper_developer_platforms::models::{AuthorAssociation, IssueState, MergeMethod};

use crate::outcomes::Denial;
use crate::references::IssueReference;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// An instruction recognised in a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Close,
    Merge(MergeMethod),
}

impl Instruction {
    /// Parses a comment body.
    ///
    /// Surrounding whitespace is ignored but the instruction itself must match
    /// exactly; a comment that merely mentions an instruction isn't one.
    ///
    /// # Examples
    ///
    /// ```
    /// use ci_gatekeeper_core::commands::Instruction;
    /// use ci_gatekeeper_developer_platforms::models::MergeMethod;
    ///
    /// assert_eq!(Instruction::parse(" /squash-and-merge\n"), Some(Instruction::Merge(MergeMethod::Squash)));
    /// assert_eq!(Instruction::parse("please /close this"), None);
    /// ```
    pub fn parse(body: &str) -> Option<Self> {
        match body.trim() {
            "/close" => Some(Instruction::Close),
            "/merge" => Some(Instruction::Merge(MergeMethod::Merge)),
            "/squash-and-merge" => Some(Instruction::Merge(MergeMethod::Squash)),
            "/rebase-and-merge" => Some(Instruction::Merge(MergeMethod::Rebase)),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Instruction::Close => "/close",
            Instruction::Merge(MergeMethod::Merge) => "/merge",
            Instruction::Merge(MergeMethod::Squash) => "/squash-and-merge",
            Instruction::Merge(MergeMethod::Rebase) => "/rebase-and-merge",
        }
    }

    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::Close => InstructionKind::Close,
            Instruction::Merge(_) => InstructionKind::Merge,
        }
    }
}

/// Instructions grouped by the permission they require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    Close,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied,
}

/// Decides whether a commenter may issue an instruction.
///
/// Computed for every comment; nothing is cached.
pub fn authorize(
    association: AuthorAssociation,
    is_author: bool,
    kind: InstructionKind,
) -> Authorization {
    let allowed = match kind {
        InstructionKind::Close => association.is_member() || is_author,
        InstructionKind::Merge => association.is_member(),
    };

    if allowed {
        Authorization::Allowed
    } else {
        Authorization::Denied
    }
}

/// Everything about a comment needed to decide what to do with it.
#[derive(Debug, Clone)]
pub struct CommentContext {
    pub body: String,
    pub commenter: String,
    pub association: AuthorAssociation,

    /// The login of the user who opened the issue or pull request
    pub issue_author: String,
    pub state: IssueState,

    /// Set when the comment was made on a pull request
    pub pull_request: Option<IssueReference>,
}

impl CommentContext {
    fn is_author(&self) -> bool {
        self.commenter == self.issue_author
    }
}

/// The action chosen for a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not an instruction
    Ignore,

    Close,

    /// Merge, subject to the merge gate
    Merge(MergeMethod),

    Deny(Denial),
}

/// Chooses the action for a comment.
///
/// `/close` requires the target to be open, then a member or the author as the
/// commenter. Merge instructions require a member, then a pull request, then an
/// open one. The first unmet requirement decides the denial.
pub fn evaluate(context: &CommentContext) -> Dispatch {
    let Some(instruction) = Instruction::parse(&context.body) else {
        return Dispatch::Ignore;
    };

    let permitted = authorize(context.association, context.is_author(), instruction.kind())
        == Authorization::Allowed;
    let permission_denied = || {
        Dispatch::Deny(Denial::PermissionDenied {
            login: context.commenter.clone(),
            instruction,
        })
    };

    match instruction {
        Instruction::Close => {
            if context.state != IssueState::Open {
                return Dispatch::Deny(Denial::AlreadyClosed { instruction });
            }
            if !permitted {
                return permission_denied();
            }
            Dispatch::Close
        }
        Instruction::Merge(method) => {
            if !permitted {
                return permission_denied();
            }
            if context.pull_request.is_none() {
                return Dispatch::Deny(Denial::NotPullRequest { instruction });
            }
            if context.state != IssueState::Open {
                return Dispatch::Deny(Denial::AlreadyClosed { instruction });
            }
            Dispatch::Merge(method)
        }
    }
}
