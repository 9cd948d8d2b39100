#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use smoke_api::config::{ServerConfig, VerdictSourceKind};
use smoke_api::engine::aggregator::Aggregator;
use smoke_api::engine::coordinator::Locator;
use smoke_api::engine::dispatcher::Dispatcher;
use smoke_api::engine::stimulus::Stimulus;
use smoke_api::engine::RunEngine;
use smoke_api::router::build_app_router;
use smoke_api::state::AppState;
use smoke_core::types::RunId;
use smoke_core::verdict::VerdictRecord;
use smoke_events::VerdictFeed;
use smoke_platform::PlatformError;

pub const PUBLIC_BASE_URL: &str = "http://orchestrator.test";

/// Build a test `ServerConfig` with safe defaults and a short run deadline.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        public_base_url: PUBLIC_BASE_URL.to_string(),
        run_deadline: Some(Duration::from_secs(2)),
        verdict_source: VerdictSourceKind::Service,
        feed_max_partitions: 64,
        expected_tests: None,
    }
}

/// Build the full application router around `feed`, fanning out to `stimuli`.
///
/// Uses the same [`build_app_router`] as `main.rs`, so the middleware stack
/// (request ID, timeout, tracing, panic recovery) is exercised too.
pub fn build_test_app(feed: Arc<VerdictFeed>, stimuli: Vec<Arc<dyn Stimulus>>) -> Router {
    build_test_app_with(test_config(), feed, stimuli)
}

/// Like [`build_test_app`], with deadlines and timeouts taken from `config`.
pub fn build_test_app_with(
    config: ServerConfig,
    feed: Arc<VerdictFeed>,
    stimuli: Vec<Arc<dyn Stimulus>>,
) -> Router {
    let mut aggregator = Aggregator::new(config.run_deadline);
    if let Some(names) = &config.expected_tests {
        aggregator = aggregator.with_known_tests(names.iter().cloned());
    }
    let engine = RunEngine::new(
        Dispatcher::new(stimuli).expect("test apps register at least one stimulus"),
        aggregator,
        feed.clone(),
        Locator::Service(config.public_base_url.clone()),
    );

    let state = AppState {
        feed,
        engine: Arc::new(engine),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Simulated subsystems
// ---------------------------------------------------------------------------

/// A subsystem whose handler reports `record` into the feed `delay` after
/// being triggered.
pub struct EchoHandler {
    pub name: &'static str,
    pub feed: Arc<VerdictFeed>,
    pub record: VerdictRecord,
    pub delay: Duration,
}

#[async_trait]
impl Stimulus for EchoHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn issue(&self, run_id: RunId) -> Result<(), PlatformError> {
        let feed = Arc::clone(&self.feed);
        let record = self.record.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = feed.append(run_id, record).await;
        });
        Ok(())
    }
}

/// One [`EchoHandler`] per `(name, record)`, staggered by 5 ms each.
pub fn echo_handlers(
    feed: &Arc<VerdictFeed>,
    verdicts: Vec<(&'static str, VerdictRecord)>,
) -> Vec<Arc<dyn Stimulus>> {
    verdicts
        .into_iter()
        .enumerate()
        .map(|(i, (name, record))| {
            Arc::new(EchoHandler {
                name,
                feed: Arc::clone(feed),
                record,
                delay: Duration::from_millis(5 * i as u64),
            }) as Arc<dyn Stimulus>
        })
        .collect()
}

/// The five subsystems of a full run, all passing.
pub fn passing_suite(feed: &Arc<VerdictFeed>) -> Vec<Arc<dyn Stimulus>> {
    echo_handlers(
        feed,
        ["auth", "db", "pubsub", "firestore", "https"]
            .into_iter()
            .map(|name| (name, VerdictRecord::pass(name)))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
