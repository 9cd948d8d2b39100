//! The seam between the run engine and wherever verdicts are stored.

use async_trait::async_trait;
use smoke_core::types::RunId;
use smoke_core::verdict::VerdictRecord;

use crate::subscription::Subscription;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The feed has been shut down and accepts no more records.
    #[error("Verdict feed is closed")]
    Closed,

    /// The backing store could not be reached or answered with an error.
    #[error("Verdict store unavailable: {0}")]
    Unavailable(String),
}

/// Ordered, append-only verdict storage partitioned by run id.
///
/// Subscribing yields every record already in the partition, then every
/// later one, each exactly once.
#[async_trait]
pub trait VerdictSource: Send + Sync {
    /// Short label for health output and logs.
    fn kind(&self) -> &'static str;

    async fn append(&self, run_id: RunId, record: VerdictRecord) -> Result<(), FeedError>;

    async fn subscribe(&self, run_id: RunId) -> Result<Subscription, FeedError>;

    /// Snapshot of the partition, in delivery order.
    async fn records(&self, run_id: RunId) -> Result<Vec<VerdictRecord>, FeedError>;

    /// Number of partitions held locally, when the store is local.
    async fn partition_count(&self) -> Option<usize> {
        None
    }

    /// Refuse further appends and subscriptions and end live subscriptions.
    async fn close(&self);
}
