//! End-to-end tests for `GET|POST /integration-tests`.
//!
//! The subsystems are simulated: each stimulus either schedules its handler's
//! verdict on the shared feed, or comes from the in-memory platform.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{
    body_json, body_text, build_test_app, build_test_app_with, echo_handlers, get,
    passing_suite, post, test_config, PUBLIC_BASE_URL,
};
use smoke_api::config::ServerConfig;
use smoke_api::engine::stimulus::{standard_stimuli, Stimulus};
use smoke_core::verdict::VerdictRecord;
use smoke_events::VerdictFeed;
use smoke_platform::memory::{MemoryIdentityDirectory, MemoryPlatform};
use tokio_util::task::TaskTracker;

/// Pull the locator out of a `FAIL - ... details at {locator}` body.
fn locator_path(body: &str) -> String {
    let locator = body
        .rsplit("details at ")
        .next()
        .expect("failure body carries a locator");
    locator
        .strip_prefix(PUBLIC_BASE_URL)
        .expect("locator is rooted at the public base url")
        .to_string()
}

// ---------------------------------------------------------------------------
// Test: every subsystem passing answers 200 PASS
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_passing_returns_pass() {
    let feed = Arc::new(VerdictFeed::new());
    let app = build_test_app(Arc::clone(&feed), passing_suite(&feed));

    let response = get(app, "/integration-tests").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_text(response).await, "PASS");
}

#[tokio::test]
async fn post_is_accepted_like_get() {
    let feed = Arc::new(VerdictFeed::new());
    let app = build_test_app(Arc::clone(&feed), passing_suite(&feed));

    let response = post(app, "/integration-tests").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "PASS");
}

// ---------------------------------------------------------------------------
// Test: a failing test answers 500 naming the test, with a working locator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_test_returns_fail_with_locator() {
    let feed = Arc::new(VerdictFeed::new());
    let app = build_test_app(
        Arc::clone(&feed),
        echo_handlers(
            &feed,
            vec![
                ("auth", VerdictRecord::pass("auth")),
                ("db", VerdictRecord::pass("db")),
                ("pubsub", VerdictRecord::fail("pubsub", "timeout")),
                ("firestore", VerdictRecord::pass("firestore")),
                ("https", VerdictRecord::pass("https")),
            ],
        ),
    );

    let response = get(app.clone(), "/integration-tests").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.starts_with("FAIL - "), "unexpected body: {body}");
    assert!(body.contains("pubsub"));
    assert!(body.contains("timeout"));

    // The locator resolves to the run's verdicts on this very service.
    let response = get(app, &locator_path(&body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let verdicts = json["data"].as_array().unwrap();
    assert!(verdicts
        .iter()
        .any(|v| v["test_name"] == "pubsub" && v["passed"] == false));
}

// ---------------------------------------------------------------------------
// Test: a rejected stimulus aborts the run before aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatch_failure_returns_fail_without_test_name() {
    let feed = Arc::new(VerdictFeed::new());
    let memory = MemoryPlatform {
        identity: Arc::new(MemoryIdentityDirectory::failing("identity creation rejected")),
        ..MemoryPlatform::new()
    };
    let app = build_test_app(
        Arc::clone(&feed),
        standard_stimuli(&memory.platform(), TaskTracker::new()),
    );

    let response = get(app, "/integration-tests").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.starts_with("FAIL - details at "), "unexpected body: {body}");
    assert!(!body.contains("test "));
}

// ---------------------------------------------------------------------------
// Test: a handler that never reports ends the run at the deadline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn silent_handler_fails_at_deadline() {
    let feed = Arc::new(VerdictFeed::new());
    // The last handler reports into a feed nobody is reading.
    let mut stimuli = echo_handlers(&feed, vec![("auth", VerdictRecord::pass("auth"))]);
    let elsewhere = Arc::new(VerdictFeed::new());
    stimuli.extend(echo_handlers(&elsewhere, vec![("db", VerdictRecord::pass("db"))]));
    let app = build_test_app(Arc::clone(&feed), stimuli);

    let response = tokio::time::timeout(Duration::from_secs(10), get(app, "/integration-tests"))
        .await
        .expect("the run deadline must end the request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("FAIL - details at "));
}

// ---------------------------------------------------------------------------
// Test: the request timeout does not cut the entry point short
// ---------------------------------------------------------------------------

/// `auth` reports into `feed`; `db` reports into a feed nobody reads.
fn half_silent_suite(feed: &Arc<VerdictFeed>) -> Vec<Arc<dyn Stimulus>> {
    let mut stimuli = echo_handlers(feed, vec![("auth", VerdictRecord::pass("auth"))]);
    let elsewhere = Arc::new(VerdictFeed::new());
    stimuli.extend(echo_handlers(&elsewhere, vec![("db", VerdictRecord::pass("db"))]));
    stimuli
}

#[tokio::test]
async fn deadline_past_request_timeout_still_renders_fail() {
    let feed = Arc::new(VerdictFeed::new());
    let config = ServerConfig {
        request_timeout_secs: 1,
        run_deadline: Some(Duration::from_secs(2)),
        ..test_config()
    };
    let app = build_test_app_with(config, Arc::clone(&feed), half_silent_suite(&feed));

    let response = tokio::time::timeout(Duration::from_secs(10), get(app, "/integration-tests"))
        .await
        .expect("the run deadline must end the request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("FAIL - details at "));
}

#[tokio::test]
async fn unbounded_run_outlives_request_timeout_until_feed_closes() {
    let feed = Arc::new(VerdictFeed::new());
    let config = ServerConfig {
        request_timeout_secs: 1,
        run_deadline: None,
        ..test_config()
    };
    let app = build_test_app_with(config, Arc::clone(&feed), half_silent_suite(&feed));

    let pending = tokio::spawn(get(app, "/integration-tests"));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!pending.is_finished(), "an unbounded run waits past the request timeout");

    feed.close().await;
    let response = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("closing the feed must end the run")
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("FAIL - details at "));
}

// ---------------------------------------------------------------------------
// Test: with an expected-test list, stray names neither fail nor complete a run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stray_failure_is_ignored_with_expected_tests() {
    let feed = Arc::new(VerdictFeed::new());
    let config = ServerConfig {
        expected_tests: Some(vec!["auth".into(), "db".into()]),
        ..test_config()
    };
    let app = build_test_app_with(
        config,
        Arc::clone(&feed),
        echo_handlers(
            &feed,
            vec![
                ("stray", VerdictRecord::fail("stray", "not part of the suite")),
                ("auth", VerdictRecord::pass("auth")),
                ("db", VerdictRecord::pass("db")),
            ],
        ),
    );

    let response = get(app, "/integration-tests").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "PASS");
}

// ---------------------------------------------------------------------------
// Test: a repeated passing name does not complete the run early
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_pass_does_not_complete_run() {
    let feed = Arc::new(VerdictFeed::new());
    let app = build_test_app(
        Arc::clone(&feed),
        echo_handlers(
            &feed,
            vec![
                ("auth", VerdictRecord::pass("auth")),
                ("auth-again", VerdictRecord::pass("auth")),
            ],
        ),
    );

    let response = get(app, "/integration-tests").await;

    // Only one distinct name ever arrives, so the deadline decides.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ---------------------------------------------------------------------------
// Test: concurrent runs are isolated
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_runs_each_pass() {
    let feed = Arc::new(VerdictFeed::new());
    let app = build_test_app(Arc::clone(&feed), passing_suite(&feed));

    let (first, second) = tokio::join!(
        get(app.clone(), "/integration-tests"),
        get(app.clone(), "/integration-tests"),
    );

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    let health = body_json(get(app, "/health").await).await;
    assert_eq!(health["feed_partitions"], 2);
}
