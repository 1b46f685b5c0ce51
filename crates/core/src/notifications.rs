//! # Notifications
//!
//! Renders the comments the gatekeeper posts. Rendering is pure; posting is left
//! to the caller.

use ci_gatekeeper_developer_platforms::models::{CheckRun, MergeMethod};
use indoc::formatdoc;

use crate::aggregate::Verdict;
use crate::outcomes::Denial;

#[cfg(test)]
#[path = "notifications_tests.rs"]
mod tests;

/// Renders the comment announcing a verdict to the author of a pull request.
///
/// Returns `None` for a pending verdict, which is never announced.
///
/// # Examples
///
/// ```
/// use ci_gatekeeper_core::aggregate::Verdict;
/// use ci_gatekeeper_core::notifications::render_verdict;
///
/// let body = render_verdict(Verdict::Success, "octocat", &[]).unwrap();
/// assert!(body.starts_with("Hey @octocat :"));
/// ```
pub fn render_verdict(verdict: Verdict, author: &str, failing_runs: &[CheckRun]) -> Option<String> {
    let message = match verdict {
        Verdict::Pending => return None,
        Verdict::Success => "Congratulations~ 🎉 Your commit has passed all the checks. Please wait for further manual review.".to_string(),
        Verdict::Cancelled => "Your checks have been cancelled ⛔️. Please re-run the checks if you want to merge this PR.".to_string(),
        Verdict::Failure => {
            let mut message = String::from(
                "Something went wrong during the checks of your commit 😟, please check the details:\n\n",
            );
            for run in failing_runs {
                message.push_str(&render_failing_run(run));
            }
            message.trim_end().to_string()
        }
    };

    Some(format!("Hey @{author} :\n\n{message}"))
}

fn render_failing_run(run: &CheckRun) -> String {
    formatdoc!(
        "
        <details>
        <summary> ⚠️ {name} <a href='{url}'>View more details</a></summary>

        {text}

        </details>

        ",
        name = run.name,
        url = run.details_url.as_deref().unwrap_or_default(),
        text = run.detail_text(),
    )
}

/// Renders the comment that explains why an instruction was refused.
pub fn render_denial(denial: &Denial, commenter: &str) -> String {
    match denial {
        Denial::PermissionDenied { login, instruction } => format!(
            "Sorry, you don't have enough permission to call instruction `{}`. 😥 @{}",
            instruction.keyword(),
            login
        ),
        Denial::AlreadyClosed { instruction } => format!(
            "Sorry @{}, instruction `{}` can only be used while the issue or pull request is open.",
            commenter,
            instruction.keyword()
        ),
        Denial::NotPullRequest { instruction } => format!(
            "Sorry @{}, instruction `{}` can only be used on a pull request.",
            commenter,
            instruction.keyword()
        ),
        Denial::NotMergeable => formatdoc!(
            "
            Sorry @{commenter}, this pull request can't be merged yet 😥.
            Please resolve the conflicts with the base branch and try again.",
            commenter = commenter,
        ),
        Denial::ChecksIncomplete => format!(
            "Sorry @{commenter}, the checks of this pull request are not finished yet ⏳. Please try again once they have completed."
        ),
        Denial::ChecksFailed => format!(
            "Sorry @{commenter}, the checks of this pull request did not pass 😟. Please fix them before merging."
        ),
    }
}

/// Renders the acknowledgment posted after a successful merge.
pub fn render_merge_acknowledgment(commenter: &str, author: &str, method: MergeMethod) -> String {
    let how = match method {
        MergeMethod::Merge => "merged",
        MergeMethod::Squash => "squashed and merged",
        MergeMethod::Rebase => "rebased and merged",
    };

    format!("This pull request has been {how} by @{commenter}. Thanks for your contribution @{author}! 🎉")
}
