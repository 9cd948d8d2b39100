//! Verdicts kept in the realtime store under `testRuns/{run_id}/{test_name}`.
//!
//! Test handlers write `{"passed": bool, "details"?: string}` as a child of
//! their run's node. Subscribing opens a streaming `GET` on that node and
//! turns every child seen for the first time into a record, which matches
//! the store's child-added semantics: the initial snapshot arrives first,
//! then later additions.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smoke_core::types::RunId;
use smoke_core::verdict::VerdictRecord;
use smoke_events::{FeedError, Subscription, VerdictSource};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::sse::{SseDecoder, SseEvent};
use super::RestClient;
use crate::config::PlatformConfig;
use crate::error::PlatformError;

/// Node under which every run's verdicts live.
pub const VERDICTS_ROOT: &str = "testRuns";

/// Where a human can browse every verdict of `run_id` in the store.
pub fn realtime_verdicts_locator(database_url: &str, run_id: RunId) -> String {
    format!(
        "{}/{VERDICTS_ROOT}/{run_id}",
        database_url.trim_end_matches('/')
    )
}

/// Shape of one stored verdict.
#[derive(Debug, Serialize, Deserialize)]
struct StoredVerdict {
    passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// A child without a boolean `passed` counts as failed.
fn record_from_child(test_name: String, value: &Value) -> VerdictRecord {
    let passed = value.get("passed").and_then(Value::as_bool).unwrap_or(false);
    let details = value
        .get("details")
        .and_then(Value::as_str)
        .map(str::to_owned);
    VerdictRecord::new(test_name, passed, details)
}

fn unavailable(e: PlatformError) -> FeedError {
    FeedError::Unavailable(e.to_string())
}

// ---------------------------------------------------------------------------
// RealtimeVerdictSource
// ---------------------------------------------------------------------------

pub struct RealtimeVerdictSource {
    client: RestClient,
    /// Same credentials, but no overall timeout: streams stay open.
    stream_client: RestClient,
    base_url: String,
    shutdown: CancellationToken,
}

impl RealtimeVerdictSource {
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        Ok(Self {
            client: RestClient::new(config)?,
            stream_client: RestClient::streaming(config)?,
            base_url: config.database_url.clone(),
            shutdown: CancellationToken::new(),
        })
    }

    fn run_url(&self, run_id: RunId) -> String {
        format!("{}/{VERDICTS_ROOT}/{run_id}.json", self.base_url)
    }

    fn verdict_url(&self, run_id: RunId, test_name: &str) -> String {
        format!("{}/{VERDICTS_ROOT}/{run_id}/{test_name}.json", self.base_url)
    }

    fn ensure_open(&self) -> Result<(), FeedError> {
        if self.shutdown.is_cancelled() {
            return Err(FeedError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl VerdictSource for RealtimeVerdictSource {
    fn kind(&self) -> &'static str {
        "realtime"
    }

    async fn append(&self, run_id: RunId, record: VerdictRecord) -> Result<(), FeedError> {
        self.ensure_open()?;
        let url = self.verdict_url(run_id, &record.test_name);
        let stored = StoredVerdict {
            passed: record.passed,
            details: record.details,
        };
        tracing::debug!(%url, run_id = %run_id, "Writing verdict to realtime store");
        self.client
            .send(self.client.http().put(&url).json(&stored))
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn subscribe(&self, run_id: RunId) -> Result<Subscription, FeedError> {
        self.ensure_open()?;
        let url = self.run_url(run_id);
        let response = self
            .stream_client
            .send(
                self.stream_client
                    .http()
                    .get(&url)
                    .header(ACCEPT, "text/event-stream"),
            )
            .await
            .map_err(unavailable)?;
        tracing::debug!(%url, run_id = %run_id, "Streaming verdicts from realtime store");

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = self.shutdown.child_token();
        tokio::spawn(pump(run_id, response, tx, cancel.clone()));

        Ok(Subscription::new(run_id, rx, move || cancel.cancel()))
    }

    async fn records(&self, run_id: RunId) -> Result<Vec<VerdictRecord>, FeedError> {
        let url = self.run_url(run_id);
        let snapshot: Value = self
            .client
            .send(self.client.http().get(&url))
            .await
            .map_err(unavailable)?
            .json()
            .await
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;

        let mut children = ChildTracker::default();
        Ok(children.added("/", snapshot))
    }

    async fn close(&self) {
        self.shutdown.cancel();
        tracing::info!("Realtime verdict streams closed");
    }
}

/// Forward newly added children from `response` until the stream ends, the
/// handle is dropped or the source is closed.
async fn pump(
    run_id: RunId,
    mut response: Response,
    tx: mpsc::UnboundedSender<VerdictRecord>,
    cancel: CancellationToken,
) {
    let mut decoder = SseDecoder::default();
    let mut children = ChildTracker::default();

    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => return,
            chunk = response.chunk() => chunk,
        };

        let bytes = match chunk {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!(run_id = %run_id, "Realtime verdict stream ended");
                return;
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Realtime verdict stream failed");
                return;
            }
        };

        for event in decoder.push(&bytes) {
            match children.apply(&event) {
                Ok(records) => {
                    for record in records {
                        if tx.send(record).is_err() {
                            return;
                        }
                    }
                }
                Err(reason) => {
                    tracing::warn!(run_id = %run_id, %reason, "Realtime verdict stream stopped");
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ChildTracker
// ---------------------------------------------------------------------------

/// Body of a `put` or `patch` event.
#[derive(Debug, Deserialize)]
struct Change {
    path: String,
    data: Value,
}

/// Turns stream events into records for children not seen before.
#[derive(Debug, Default)]
struct ChildTracker {
    seen: HashSet<String>,
}

impl ChildTracker {
    /// `Err` when the store ends the stream on its side.
    fn apply(&mut self, event: &SseEvent) -> Result<Vec<VerdictRecord>, String> {
        match event.event.as_str() {
            "put" | "patch" => {
                let change: Change = serde_json::from_str(&event.data)
                    .map_err(|e| format!("malformed {} event: {e}", event.event))?;
                Ok(self.added(&change.path, change.data))
            }
            "cancel" | "auth_revoked" => Err(format!("{}: {}", event.event, event.data)),
            _ => Ok(Vec::new()),
        }
    }

    /// Records for first-seen children in a change at `path`.
    ///
    /// Changes below a child (`/{name}/field`) never add a child.
    fn added(&mut self, path: &str, data: Value) -> Vec<VerdictRecord> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match (segments.as_slice(), data) {
            ([], Value::Object(children)) => children
                .into_iter()
                .filter_map(|(name, value)| self.first_sight(name, &value))
                .collect(),
            ([name], value) => self
                .first_sight(name.to_string(), &value)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    fn first_sight(&mut self, name: String, value: &Value) -> Option<VerdictRecord> {
        if value.is_null() || !self.seen.insert(name.clone()) {
            return None;
        }
        Some(record_from_child(name, value))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
