use super::*;
use crate::test_utils::*;
use ci_gatekeeper_developer_platforms::models::CheckConclusion;

#[tokio::test]
async fn test_collects_completed_suites_with_runs() {
    let platform = MockPlatform::new()
        .with_suite(
            suite(1, "cirrus-ci", Some(CheckConclusion::Success)),
            vec![run(10, "build", CheckConclusion::Success)],
        )
        .with_suite(
            suite(2, "github-actions", Some(CheckConclusion::Failure)),
            vec![
                run(20, "lint", CheckConclusion::Failure),
                run(21, "test", CheckConclusion::Success),
            ],
        );

    let results = collect_check_results(
        &platform,
        &ProviderRegistry::default(),
        OWNER,
        REPO,
        HEAD_SHA,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].provider, CiProvider::CirrusCi);
    assert_eq!(results[0].runs.len(), 1);
    assert_eq!(results[1].provider, CiProvider::GitHubActions);
    assert_eq!(results[1].runs.len(), 2);
}

#[tokio::test]
async fn test_unrecognised_provider_is_ignored() {
    let platform = MockPlatform::new()
        .with_suite(
            suite(1, "github-actions", Some(CheckConclusion::Success)),
            vec![run(10, "build", CheckConclusion::Success)],
        )
        .with_suite(running_suite(2, "dependabot"), Vec::new());

    let results = collect_check_results(
        &platform,
        &ProviderRegistry::default(),
        OWNER,
        REPO,
        HEAD_SHA,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].suite.id, 1);
    // Runs of the ignored suite are never requested
    let run_calls = platform
        .calls()
        .iter()
        .filter(|c| c.as_str() == "list_check_runs")
        .count();
    assert_eq!(run_calls, 1);
}

#[tokio::test]
async fn test_incomplete_suite_is_not_ready() {
    let platform = MockPlatform::new()
        .with_suite(
            suite(1, "cirrus-ci", Some(CheckConclusion::Success)),
            vec![run(10, "build", CheckConclusion::Success)],
        )
        .with_suite(running_suite(2, "github-actions"), Vec::new());

    let result = collect_check_results(
        &platform,
        &ProviderRegistry::default(),
        OWNER,
        REPO,
        HEAD_SHA,
    )
    .await;

    assert!(matches!(result, Err(GatekeeperError::NotReady)));
    assert!(!platform.calls().contains(&"list_check_runs".to_string()));
}

#[tokio::test]
async fn test_incomplete_run_is_not_ready() {
    let mut pending = run(11, "integration", CheckConclusion::Success);
    pending.status = CheckStatus::InProgress;
    pending.conclusion = None;

    let platform = MockPlatform::new().with_suite(
        suite(1, "cirrus-ci", Some(CheckConclusion::Success)),
        vec![run(10, "build", CheckConclusion::Success), pending],
    );

    let result = collect_check_results(
        &platform,
        &ProviderRegistry::default(),
        OWNER,
        REPO,
        HEAD_SHA,
    )
    .await;

    assert!(matches!(result, Err(GatekeeperError::NotReady)));
}

#[tokio::test]
async fn test_no_suites_collects_nothing() {
    let platform = MockPlatform::new();

    let results = collect_check_results(
        &platform,
        &ProviderRegistry::default(),
        OWNER,
        REPO,
        HEAD_SHA,
    )
    .await
    .unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_listing_failure_is_upstream_failure() {
    let platform = MockPlatform::new().failing("list_check_suites");

    let result = collect_check_results(
        &platform,
        &ProviderRegistry::default(),
        OWNER,
        REPO,
        HEAD_SHA,
    )
    .await;

    assert!(matches!(result, Err(GatekeeperError::UpstreamFailure(_))));
}

#[tokio::test]
async fn test_run_listing_failure_is_upstream_failure() {
    let platform = MockPlatform::new()
        .with_suite(
            suite(1, "cirrus-ci", Some(CheckConclusion::Success)),
            Vec::new(),
        )
        .failing("list_check_runs");

    let result = collect_check_results(
        &platform,
        &ProviderRegistry::default(),
        OWNER,
        REPO,
        HEAD_SHA,
    )
    .await;

    assert!(matches!(result, Err(GatekeeperError::UpstreamFailure(_))));
}
