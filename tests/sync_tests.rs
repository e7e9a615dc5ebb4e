mod common;

use assert_fs::prelude::*;
use predicates::prelude::*;
use reposnap::{Policy, RepositoryRef, Settings, SyncEngine, SyncResult, SyncTarget};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{list_files, mount_archive, mount_missing, zip_bytes, TestEnvironment};

fn repo(name: &str) -> RepositoryRef {
    RepositoryRef::new(name, vec!["main".to_string(), "master".to_string()]).unwrap()
}

fn engine_for(env: &TestEnvironment, server: &MockServer, repos: Vec<RepositoryRef>) -> SyncEngine {
    let mut settings = Settings::new(SyncTarget::new(env.target().path()), repos);
    settings.archive_url = server.uri();
    SyncEngine::new(settings).expect("Failed to create sync engine")
}

fn failure_of(result: &SyncResult) -> &str {
    match result {
        SyncResult::Failed { error, .. } => error,
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fallback_branch_installs_without_wrapper() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    mount_missing(&server, "acme/widgets", "main").await;
    mount_archive(
        &server,
        "acme/widgets",
        "master",
        zip_bytes(&[("widgets-abcd1234/src/a.txt", "alpha")]),
    )
    .await;

    let summary = engine_for(&env, &server, vec![repo("acme/widgets")])
        .run()
        .await
        .unwrap();

    assert_eq!(summary.installed, 1);
    assert!(matches!(
        &summary.results[0],
        SyncResult::Installed { branch: Some(b), .. } if b == "master"
    ));
    env.target().child("widgets/src/a.txt").assert("alpha");
    env.target()
        .child("widgets/widgets-abcd1234")
        .assert(predicate::path::missing());
}

#[tokio::test]
async fn test_fallback_is_transparent() {
    let archive = zip_bytes(&[
        ("widgets-1/", ""),
        ("widgets-1/README.md", "readme"),
        ("widgets-1/src/lib.rs", "pub fn a() {}"),
        ("widgets-1/docs/guide/intro.md", "intro"),
    ]);

    let direct_env = TestEnvironment::new();
    let direct = MockServer::start().await;
    mount_archive(&direct, "acme/widgets", "main", archive.clone()).await;
    engine_for(&direct_env, &direct, vec![repo("acme/widgets")])
        .run()
        .await
        .unwrap();

    let fallback_env = TestEnvironment::new();
    let fallback = MockServer::start().await;
    mount_missing(&fallback, "acme/widgets", "main").await;
    mount_archive(&fallback, "acme/widgets", "master", archive).await;
    engine_for(&fallback_env, &fallback, vec![repo("acme/widgets")])
        .run()
        .await
        .unwrap();

    let direct_files = list_files(&direct_env.target().path().join("widgets"));
    let fallback_files = list_files(&fallback_env.target().path().join("widgets"));
    assert_eq!(direct_files, vec!["README.md", "docs/guide/intro.md", "src/lib.rs"]);
    assert_eq!(direct_files, fallback_files);
}

#[tokio::test]
async fn test_all_branches_missing_leaves_destination_untouched() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    env.seed_file("widgets/keep.txt", "old");

    let summary = engine_for(&env, &server, vec![repo("acme/widgets"), repo("acme/gadgets")])
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 2);
    assert!(failure_of(&summary.results[0]).contains("could not be downloaded"));
    env.target().child("widgets/keep.txt").assert("old");
    env.target().child("gadgets").assert(predicate::path::missing());
}

#[tokio::test]
async fn test_rerun_replaces_stale_content() {
    let env = TestEnvironment::new();

    let first = MockServer::start().await;
    mount_archive(
        &first,
        "acme/widgets",
        "main",
        zip_bytes(&[("widgets-v1/old.txt", "v1"), ("widgets-v1/shared.txt", "v1")]),
    )
    .await;
    engine_for(&env, &first, vec![repo("acme/widgets")])
        .run()
        .await
        .unwrap();
    env.target().child("widgets/old.txt").assert("v1");

    let second = MockServer::start().await;
    mount_archive(
        &second,
        "acme/widgets",
        "main",
        zip_bytes(&[("widgets-v2/new.txt", "v2"), ("widgets-v2/shared.txt", "v2")]),
    )
    .await;
    engine_for(&env, &second, vec![repo("acme/widgets")])
        .run()
        .await
        .unwrap();

    assert_eq!(
        list_files(&env.target().path().join("widgets")),
        vec!["new.txt", "shared.txt"]
    );
    env.target().child("widgets/shared.txt").assert("v2");
}

#[tokio::test]
async fn test_flat_archive_is_malformed() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    mount_archive(
        &server,
        "acme/widgets",
        "main",
        zip_bytes(&[("a.txt", "a"), ("b.txt", "b")]),
    )
    .await;

    let summary = engine_for(&env, &server, vec![repo("acme/widgets")])
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert!(failure_of(&summary.results[0]).contains("malformed archive"));
    env.target().child("widgets").assert(predicate::path::missing());
}

#[tokio::test]
async fn test_one_failure_does_not_block_the_rest() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    mount_archive(
        &server,
        "acme/first",
        "main",
        zip_bytes(&[("first-1/one.txt", "1")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/acme/broken/zip/refs/heads/main"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_archive(
        &server,
        "acme/last",
        "main",
        zip_bytes(&[("last-1/three.txt", "3")]),
    )
    .await;

    let summary = engine_for(
        &env,
        &server,
        vec![repo("acme/first"), repo("acme/broken"), repo("acme/last")],
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.installed, 2);
    assert_eq!(summary.failed, 1);
    assert!(failure_of(&summary.results[1]).contains("503"));
    env.target().child("first/one.txt").assert("1");
    env.target().child("last/three.txt").assert("3");
    env.target().child("broken").assert(predicate::path::missing());
}

#[tokio::test]
async fn test_skip_if_present_makes_no_request() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    env.seed_file("widgets/local.txt", "mine");

    let mut settings = Settings::new(SyncTarget::new(env.target().path()), vec![repo("acme/widgets")]);
    settings.archive_url = server.uri();
    settings.policy = Policy::SkipIfPresent;
    let summary = SyncEngine::new(settings).unwrap().run().await.unwrap();

    assert_eq!(summary.skipped, 1);
    env.target().child("widgets/local.txt").assert("mine");
}
