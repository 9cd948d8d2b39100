//! In-process verdict feed backed by per-subscriber `tokio::sync::mpsc`
//! channels.
//!
//! [`VerdictFeed`] is designed to be shared via `Arc<VerdictFeed>` between
//! the HTTP handlers that append reports and the aggregators that wait on
//! them. Each run id owns one partition; records within a partition are
//! delivered to every subscriber in append order, and a new subscriber first
//! receives everything already appended to the partition.
//!
//! The feed keeps at most `max_partitions` partitions. Creating one more
//! evicts the oldest partition nobody is subscribed to; run ids are time
//! ordered, so "oldest" is the smallest id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use smoke_core::types::RunId;
use smoke_core::verdict::VerdictRecord;
use tokio::sync::{mpsc, RwLock};

use crate::source::{FeedError, VerdictSource};
use crate::subscription::Subscription;

/// Default retention: enough for every run of a busy day.
pub const DEFAULT_MAX_PARTITIONS: usize = 1024;

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Subscription bookkeeping for one partition, shared with its handles.
#[derive(Debug, Default)]
struct SubscriptionStats {
    closed: AtomicUsize,
}

#[derive(Default)]
struct Partition {
    records: Vec<VerdictRecord>,
    subscribers: Vec<mpsc::UnboundedSender<VerdictRecord>>,
    stats: Arc<SubscriptionStats>,
}

impl Partition {
    fn has_live_subscribers(&mut self) -> bool {
        self.subscribers.retain(|tx| !tx.is_closed());
        !self.subscribers.is_empty()
    }
}

struct Inner {
    partitions: HashMap<RunId, Partition>,
    max_partitions: usize,
    closed: bool,
}

impl Inner {
    /// The partition of `run_id`, created (and room made for it) if needed.
    fn partition(&mut self, run_id: RunId) -> &mut Partition {
        if !self.partitions.contains_key(&run_id) {
            self.evict_for_new();
        }
        self.partitions.entry(run_id).or_default()
    }

    fn evict_for_new(&mut self) {
        while self.partitions.len() >= self.max_partitions {
            let victim = self
                .partitions
                .iter_mut()
                .filter_map(|(id, p)| (!p.has_live_subscribers()).then_some(*id))
                .min();
            match victim {
                Some(id) => {
                    self.partitions.remove(&id);
                    tracing::debug!(run_id = %id, "Evicted verdict partition");
                }
                None => {
                    tracing::warn!(
                        partitions = self.partitions.len(),
                        max = self.max_partitions,
                        "Every verdict partition is in use, exceeding retention"
                    );
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// VerdictFeed
// ---------------------------------------------------------------------------

/// Ordered append-only feed of verdicts, partitioned by run id.
pub struct VerdictFeed {
    inner: RwLock<Inner>,
}

impl Default for VerdictFeed {
    fn default() -> Self {
        Self::with_retention(DEFAULT_MAX_PARTITIONS)
    }
}

impl VerdictFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed that holds at most `max_partitions` partitions (minimum 1).
    pub fn with_retention(max_partitions: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                partitions: HashMap::new(),
                max_partitions: max_partitions.max(1),
                closed: false,
            }),
        }
    }

    /// Append a record to the partition of `run_id`.
    ///
    /// Returns the zero-based position of the record within its partition.
    /// Subscribers whose handle has been dropped are pruned here.
    pub async fn append(&self, run_id: RunId, record: VerdictRecord) -> Result<usize, FeedError> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(FeedError::Closed);
        }

        let partition = inner.partition(run_id);
        partition
            .subscribers
            .retain(|tx| tx.send(record.clone()).is_ok());
        partition.records.push(record);

        let position = partition.records.len() - 1;
        tracing::debug!(run_id = %run_id, position, "Verdict appended");
        Ok(position)
    }

    /// Open a subscription on the partition of `run_id`.
    ///
    /// Records already in the partition are queued on the new handle before
    /// any later append, so nothing is missed and nothing is delivered twice.
    pub async fn subscribe(&self, run_id: RunId) -> Result<Subscription, FeedError> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(FeedError::Closed);
        }

        let partition = inner.partition(run_id);
        let (tx, rx) = mpsc::unbounded_channel();
        for record in &partition.records {
            // The receiver is held below, so this cannot fail.
            let _ = tx.send(record.clone());
        }
        partition.subscribers.push(tx);

        tracing::debug!(
            run_id = %run_id,
            backlog = partition.records.len(),
            "Subscribed to verdict feed"
        );

        let stats = Arc::clone(&partition.stats);
        Ok(Subscription::new(run_id, rx, move || {
            stats.closed.fetch_add(1, Ordering::SeqCst);
        }))
    }

    /// Snapshot of every record appended to `run_id`, in append order.
    pub async fn records(&self, run_id: RunId) -> Vec<VerdictRecord> {
        self.inner
            .read()
            .await
            .partitions
            .get(&run_id)
            .map(|p| p.records.clone())
            .unwrap_or_default()
    }

    /// Number of run partitions the feed currently holds.
    pub async fn partition_count(&self) -> usize {
        self.inner.read().await.partitions.len()
    }

    /// Number of live subscriptions on `run_id`.
    pub async fn active_subscribers(&self, run_id: RunId) -> usize {
        self.inner
            .read()
            .await
            .partitions
            .get(&run_id)
            .map(|p| p.subscribers.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Number of subscriptions on `run_id` that have been released.
    pub async fn unsubscribe_count(&self, run_id: RunId) -> usize {
        self.inner
            .read()
            .await
            .partitions
            .get(&run_id)
            .map(|p| p.stats.closed.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Stop accepting appends and subscriptions.
    ///
    /// Live subscriptions drain what they already hold and then observe the
    /// end of the feed.
    pub async fn close(&self) {
        let mut inner = self.inner.write().await;
        inner.closed = true;
        for partition in inner.partitions.values_mut() {
            partition.subscribers.clear();
        }
        tracing::info!("Verdict feed closed");
    }
}

#[async_trait]
impl VerdictSource for VerdictFeed {
    fn kind(&self) -> &'static str {
        "in_process"
    }

    async fn append(&self, run_id: RunId, record: VerdictRecord) -> Result<(), FeedError> {
        VerdictFeed::append(self, run_id, record).await.map(|_| ())
    }

    async fn subscribe(&self, run_id: RunId) -> Result<Subscription, FeedError> {
        VerdictFeed::subscribe(self, run_id).await
    }

    async fn records(&self, run_id: RunId) -> Result<Vec<VerdictRecord>, FeedError> {
        Ok(VerdictFeed::records(self, run_id).await)
    }

    async fn partition_count(&self) -> Option<usize> {
        Some(VerdictFeed::partition_count(self).await)
    }

    async fn close(&self) {
        VerdictFeed::close(self).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
