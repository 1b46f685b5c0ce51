use super::*;
use crate::commands::Instruction;
use ci_gatekeeper_developer_platforms::models::{
    CheckConclusion, CheckRunOutput, CheckStatus,
};

fn failing_run(name: &str, text: Option<&str>, summary: Option<&str>) -> CheckRun {
    CheckRun {
        id: 1,
        name: name.to_string(),
        status: CheckStatus::Completed,
        conclusion: Some(CheckConclusion::Failure),
        details_url: Some(format!("https://cirrus-ci.com/task/{name}")),
        external_id: None,
        output: CheckRunOutput {
            summary: summary.map(str::to_string),
            text: text.map(str::to_string),
        },
    }
}

#[test]
fn test_render_success() {
    let body = render_verdict(Verdict::Success, "alice", &[]).unwrap();

    assert_eq!(
        body,
        "Hey @alice :\n\nCongratulations~ 🎉 Your commit has passed all the checks. Please wait for further manual review."
    );
}

#[test]
fn test_render_cancelled() {
    let body = render_verdict(Verdict::Cancelled, "alice", &[]).unwrap();

    assert!(body.starts_with("Hey @alice :\n\n"));
    assert!(body.contains("cancelled"));
    assert!(body.contains("re-run"));
}

#[test]
fn test_render_pending_is_silent() {
    assert_eq!(render_verdict(Verdict::Pending, "alice", &[]), None);
}

#[test]
fn test_render_failure_with_details() {
    let runs = vec![
        failing_run("lint", Some("3 warnings treated as errors"), Some("lint failed")),
        failing_run("unit", None, Some("2 tests failed")),
    ];

    let body = render_verdict(Verdict::Failure, "alice", &runs).unwrap();

    assert!(body.starts_with("Hey @alice :\n\nSomething went wrong"));
    assert_eq!(body.matches("<details>").count(), 2);
    assert!(body.contains(
        "<summary> ⚠️ lint <a href='https://cirrus-ci.com/task/lint'>View more details</a></summary>"
    ));
    assert!(body.contains("3 warnings treated as errors"));
    assert!(!body.contains("lint failed"));
    assert!(body.contains("2 tests failed"));
    assert!(body.find("lint").unwrap() < body.find("unit").unwrap());
    assert!(body.ends_with("</details>"));
}

#[test]
fn test_render_failure_without_text_or_summary() {
    let runs = vec![failing_run("build", None, None)];

    let body = render_verdict(Verdict::Failure, "alice", &runs).unwrap();

    assert!(body.contains("build"));
    assert!(body.contains("</details>"));
}

#[test]
fn test_render_permission_denied() {
    let denial = Denial::PermissionDenied {
        login: "mallory".to_string(),
        instruction: Instruction::Close,
    };

    assert_eq!(
        render_denial(&denial, "mallory"),
        "Sorry, you don't have enough permission to call instruction `/close`. 😥 @mallory"
    );
}

#[test]
fn test_render_denials_are_distinct() {
    let denials = [
        Denial::AlreadyClosed {
            instruction: Instruction::Close,
        },
        Denial::NotPullRequest {
            instruction: Instruction::Merge(MergeMethod::Squash),
        },
        Denial::NotMergeable,
        Denial::ChecksIncomplete,
        Denial::ChecksFailed,
    ];

    let bodies: Vec<_> = denials.iter().map(|d| render_denial(d, "bob")).collect();

    for (i, body) in bodies.iter().enumerate() {
        assert!(body.contains("@bob"), "{body}");
        for other in &bodies[i + 1..] {
            assert_ne!(body, other);
        }
    }
    assert!(bodies[1].contains("`/squash-and-merge`"));
    assert!(bodies[2].contains("conflicts"));
}

#[test]
fn test_render_merge_acknowledgment_names_both_users() {
    let body = render_merge_acknowledgment("owner", "alice", MergeMethod::Squash);

    assert!(body.contains("@owner"));
    assert!(body.contains("@alice"));
    assert!(body.contains("squashed"));
}
