//! The actions that trigger each subsystem's test handler.
//!
//! A [`Stimulus`] is fire-and-confirm: `issue` resolves once the platform has
//! accepted the write/publish/create/call, not once the downstream handler
//! has run. Every payload carries the run id so the handler can report into
//! the right feed partition.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use smoke_core::types::RunId;
use smoke_platform::{
    CallableInvoker, DocumentStore, IdentityDirectory, NewUser, Platform, PlatformError,
    PubSubTopic, RealtimeStore,
};
use tokio_util::task::TaskTracker;

/// Topic the messaging handler listens on.
pub const PUBSUB_TOPIC: &str = "pubsubTests";

/// Collection the document handler watches.
pub const FIRESTORE_COLLECTION: &str = "tests";

/// Name of the callable endpoint under test.
pub const CALLABLE_NAME: &str = "callableTests";

/// Password given to throwaway directory users.
const TEST_USER_PASSWORD: &str = "secret";

/// Email domain for throwaway directory users.
const TEST_USER_DOMAIN: &str = "fake.com";

/// One trigger for one subsystem.
#[async_trait]
pub trait Stimulus: Send + Sync {
    /// Short, stable name used in logs and dispatch errors.
    fn name(&self) -> &str;

    async fn issue(&self, run_id: RunId) -> Result<(), PlatformError>;
}

/// Realtime store path whose creation triggers the database handler.
pub fn database_trigger_path(run_id: RunId) -> String {
    format!("dbTests/{run_id}/start")
}

// ---------------------------------------------------------------------------
// Realtime database
// ---------------------------------------------------------------------------

pub struct DatabaseStimulus {
    store: Arc<dyn RealtimeStore>,
}

impl DatabaseStimulus {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stimulus for DatabaseStimulus {
    fn name(&self) -> &str {
        "database"
    }

    async fn issue(&self, run_id: RunId) -> Result<(), PlatformError> {
        // Server-side timestamp sentinel.
        self.store
            .set(&database_trigger_path(run_id), json!({ ".sv": "timestamp" }))
            .await
    }
}

// ---------------------------------------------------------------------------
// Pub/Sub
// ---------------------------------------------------------------------------

pub struct PubSubStimulus {
    topic: Arc<dyn PubSubTopic>,
}

impl PubSubStimulus {
    pub fn new(topic: Arc<dyn PubSubTopic>) -> Self {
        Self { topic }
    }
}

#[async_trait]
impl Stimulus for PubSubStimulus {
    fn name(&self) -> &str {
        "pubsub"
    }

    async fn issue(&self, run_id: RunId) -> Result<(), PlatformError> {
        let message_id = self
            .topic
            .publish(PUBSUB_TOPIC, &json!({ "testId": run_id }))
            .await?;
        tracing::debug!(run_id = %run_id, %message_id, "Published trigger message");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Identity directory
// ---------------------------------------------------------------------------

/// Creates a throwaway user, then deletes it in the background.
///
/// The delete runs on `cleanup` so it never holds up dispatch; its failure
/// is logged and otherwise ignored.
pub struct AuthStimulus {
    directory: Arc<dyn IdentityDirectory>,
    cleanup: TaskTracker,
}

impl AuthStimulus {
    pub fn new(directory: Arc<dyn IdentityDirectory>, cleanup: TaskTracker) -> Self {
        Self { directory, cleanup }
    }
}

#[async_trait]
impl Stimulus for AuthStimulus {
    fn name(&self) -> &str {
        "auth"
    }

    async fn issue(&self, run_id: RunId) -> Result<(), PlatformError> {
        let user = self
            .directory
            .create_user(NewUser {
                email: format!("{run_id}@{TEST_USER_DOMAIN}"),
                password: TEST_USER_PASSWORD.to_string(),
                display_name: run_id.to_string(),
            })
            .await?;

        let directory = Arc::clone(&self.directory);
        self.cleanup.spawn(async move {
            match directory.delete_user(&user.uid).await {
                Ok(()) => tracing::debug!(run_id = %run_id, uid = %user.uid, "Test user deleted"),
                Err(e) => tracing::warn!(
                    run_id = %run_id,
                    uid = %user.uid,
                    error = %e,
                    "Failed to delete test user"
                ),
            }
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

pub struct FirestoreStimulus {
    documents: Arc<dyn DocumentStore>,
}

impl FirestoreStimulus {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl Stimulus for FirestoreStimulus {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn issue(&self, run_id: RunId) -> Result<(), PlatformError> {
        let doc_id = run_id.to_string();
        self.documents
            .set(FIRESTORE_COLLECTION, &doc_id, json!({ "test": doc_id }))
            .await
    }
}

// ---------------------------------------------------------------------------
// Callable endpoint
// ---------------------------------------------------------------------------

pub struct CallableStimulus {
    invoker: Arc<dyn CallableInvoker>,
}

impl CallableStimulus {
    pub fn new(invoker: Arc<dyn CallableInvoker>) -> Self {
        Self { invoker }
    }
}

/// Data sent to the callable endpoint (wrapped in `{"data": ...}` on the wire).
pub fn callable_payload(run_id: RunId) -> Value {
    json!({ "foo": "bar", "testId": run_id })
}

#[async_trait]
impl Stimulus for CallableStimulus {
    fn name(&self) -> &str {
        "callable"
    }

    async fn issue(&self, run_id: RunId) -> Result<(), PlatformError> {
        self.invoker
            .call(CALLABLE_NAME, callable_payload(run_id))
            .await
            .map(|_| ())
    }
}

/// The five stimuli of a full run, one per subsystem.
pub fn standard_stimuli(platform: &Platform, cleanup: TaskTracker) -> Vec<Arc<dyn Stimulus>> {
    vec![
        Arc::new(DatabaseStimulus::new(Arc::clone(&platform.realtime))),
        Arc::new(PubSubStimulus::new(Arc::clone(&platform.pubsub))),
        Arc::new(AuthStimulus::new(Arc::clone(&platform.identity), cleanup)),
        Arc::new(FirestoreStimulus::new(Arc::clone(&platform.documents))),
        Arc::new(CallableStimulus::new(Arc::clone(&platform.callable))),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use smoke_platform::memory::{MemoryIdentityDirectory, MemoryPlatform};

    use super::*;

    #[tokio::test]
    async fn database_stimulus_writes_timestamp_sentinel() {
        let memory = MemoryPlatform::new();
        let run_id = RunId::generate();

        DatabaseStimulus::new(memory.realtime.clone())
            .issue(run_id)
            .await
            .unwrap();

        let written = memory.realtime.get(&database_trigger_path(run_id)).await;
        assert_eq!(written, Some(json!({".sv": "timestamp"})));
    }

    #[tokio::test]
    async fn pubsub_stimulus_publishes_run_id() {
        let memory = MemoryPlatform::new();
        let run_id = RunId::generate();

        PubSubStimulus::new(memory.pubsub.clone())
            .issue(run_id)
            .await
            .unwrap();

        let published = memory.pubsub.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, PUBSUB_TOPIC);
        assert_eq!(published[0].1["testId"], run_id.to_string());
    }

    #[tokio::test]
    async fn auth_stimulus_creates_then_deletes_user() {
        let memory = MemoryPlatform::new();
        let tracker = TaskTracker::new();
        let run_id = RunId::generate();

        AuthStimulus::new(memory.identity.clone(), tracker.clone())
            .issue(run_id)
            .await
            .unwrap();

        tracker.close();
        tracker.wait().await;

        assert!(memory.identity.users().await.is_empty());
        assert_eq!(memory.identity.deleted().await.len(), 1);
    }

    #[tokio::test]
    async fn auth_stimulus_uses_run_id_for_identity() {
        // Deletes fail here, so the created user stays inspectable.
        let directory = Arc::new(MemoryIdentityDirectory::failing_deletes("denied"));
        let tracker = TaskTracker::new();
        let run_id = RunId::generate();

        AuthStimulus::new(directory.clone(), tracker.clone())
            .issue(run_id)
            .await
            .expect("a failed delete must not fail the stimulus");

        tracker.close();
        tracker.wait().await;

        let users = directory.users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, format!("{run_id}@fake.com"));
        assert_eq!(users[0].display_name, run_id.to_string());
        assert_eq!(users[0].password, "secret");
    }

    #[tokio::test]
    async fn auth_stimulus_propagates_creation_failure() {
        let directory = Arc::new(MemoryIdentityDirectory::failing("quota exceeded"));
        let tracker = TaskTracker::new();

        let result = AuthStimulus::new(directory, tracker.clone())
            .issue(RunId::generate())
            .await;

        assert_matches!(result, Err(PlatformError::Rejected(msg)) if msg == "quota exceeded");
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn firestore_stimulus_writes_document_named_after_run() {
        let memory = MemoryPlatform::new();
        let run_id = RunId::generate();

        FirestoreStimulus::new(memory.documents.clone())
            .issue(run_id)
            .await
            .unwrap();

        let doc = memory
            .documents
            .get(FIRESTORE_COLLECTION, &run_id.to_string())
            .await;
        assert_eq!(doc, Some(json!({"test": run_id.to_string()})));
    }

    #[tokio::test]
    async fn callable_stimulus_sends_run_id() {
        let memory = MemoryPlatform::new();
        let run_id = RunId::generate();

        CallableStimulus::new(memory.callable.clone())
            .issue(run_id)
            .await
            .unwrap();

        let calls = memory.callable.calls().await;
        assert_eq!(calls, vec![(CALLABLE_NAME.to_string(), callable_payload(run_id))]);
        assert_eq!(calls[0].1["foo"], "bar");
    }

    #[test]
    fn standard_set_has_one_stimulus_per_subsystem() {
        let memory = MemoryPlatform::new();
        let stimuli = standard_stimuli(&memory.platform(), TaskTracker::new());
        let names: Vec<&str> = stimuli.iter().map(|s| s.name()).collect();

        assert_eq!(names, ["database", "pubsub", "auth", "firestore", "callable"]);
    }
}
