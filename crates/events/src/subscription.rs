use smoke_core::types::RunId;
use smoke_core::verdict::VerdictRecord;
use tokio::sync::mpsc;

/// Handle onto one verdict partition.
///
/// Dropping the handle (directly or through [`Subscription::unsubscribe`])
/// detaches it from its source exactly once.
pub struct Subscription {
    run_id: RunId,
    receiver: mpsc::UnboundedReceiver<VerdictRecord>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap `receiver`; `release` runs once when the handle is dropped.
    pub fn new(
        run_id: RunId,
        receiver: mpsc::UnboundedReceiver<VerdictRecord>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            run_id,
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Wait for the next record. `None` once the source has ended and
    /// everything queued on this handle has been read.
    pub async fn next(&mut self) -> Option<VerdictRecord> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(release) = self.release.take() {
            release();
        }
        tracing::debug!(run_id = %self.run_id, "Unsubscribed from verdict feed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn release_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::clone(&released);
        let mut sub = Subscription::new(RunId::generate(), rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tx.send(VerdictRecord::pass("auth")).unwrap();
        assert_eq!(sub.next().await.unwrap().test_name, "auth");

        sub.unsubscribe();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(tx.is_closed());
    }
}
