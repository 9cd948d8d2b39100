//! In-process collaborators that record every call.
//!
//! Each type can be built healthy (`new`) or pre-armed to reject every call
//! with a fixed message (`failing`), which is how dispatch failures are
//! exercised without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::collaborators::{
    CallableInvoker, DocumentStore, IdentityDirectory, NewUser, Platform, PubSubTopic,
    RealtimeStore, UserRecord,
};
use crate::error::PlatformError;

fn check(failure: &Option<String>) -> Result<(), PlatformError> {
    match failure {
        Some(msg) => Err(PlatformError::Rejected(msg.clone())),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Realtime store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRealtimeStore {
    values: Mutex<HashMap<String, Value>>,
    failure: Option<String>,
}

impl MemoryRealtimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            failure: Some(msg.into()),
            ..Self::default()
        }
    }

    pub async fn get(&self, path: &str) -> Option<Value> {
        self.values.lock().await.get(path).cloned()
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtimeStore {
    async fn set(&self, path: &str, value: Value) -> Result<(), PlatformError> {
        check(&self.failure)?;
        self.values.lock().await.insert(path.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pub/Sub
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryPubSubTopic {
    messages: Mutex<Vec<(String, Value)>>,
    failure: Option<String>,
}

impl MemoryPubSubTopic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            failure: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Every `(topic, payload)` published so far, in order.
    pub async fn published(&self) -> Vec<(String, Value)> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl PubSubTopic for MemoryPubSubTopic {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<String, PlatformError> {
        check(&self.failure)?;
        let mut messages = self.messages.lock().await;
        messages.push((topic.to_string(), payload.clone()));
        Ok(format!("msg-{}", messages.len()))
    }
}

// ---------------------------------------------------------------------------
// Identity directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryIdentityDirectory {
    users: Mutex<HashMap<String, NewUser>>,
    deleted: Mutex<Vec<String>>,
    next_uid: AtomicUsize,
    create_failure: Option<String>,
    delete_failure: Option<String>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every `create_user` call.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            create_failure: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Accept creations but reject every `delete_user` call.
    pub fn failing_deletes(msg: impl Into<String>) -> Self {
        Self {
            delete_failure: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Users currently present in the directory.
    pub async fn users(&self) -> Vec<NewUser> {
        self.users.lock().await.values().cloned().collect()
    }

    /// Uids removed through `delete_user`, in order.
    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl IdentityDirectory for MemoryIdentityDirectory {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, PlatformError> {
        check(&self.create_failure)?;
        let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        let record = UserRecord {
            uid: uid.clone(),
            email: Some(user.email.clone()),
            display_name: Some(user.display_name.clone()),
        };
        self.users.lock().await.insert(uid, user);
        Ok(record)
    }

    async fn delete_user(&self, uid: &str) -> Result<(), PlatformError> {
        check(&self.delete_failure)?;
        if self.users.lock().await.remove(uid).is_none() {
            return Err(PlatformError::Rejected(format!("no user {uid}")));
        }
        self.deleted.lock().await.push(uid.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<(String, String), Value>>,
    failure: Option<String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            failure: Some(msg.into()),
            ..Self::default()
        }
    }

    pub async fn get(&self, collection: &str, doc_id: &str) -> Option<Value> {
        self.documents
            .lock()
            .await
            .get(&(collection.to_string(), doc_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set(
        &self,
        collection: &str,
        doc_id: &str,
        document: Value,
    ) -> Result<(), PlatformError> {
        check(&self.failure)?;
        self.documents
            .lock()
            .await
            .insert((collection.to_string(), doc_id.to_string()), document);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Callable invoker
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCallableInvoker {
    calls: Mutex<Vec<(String, Value)>>,
    failure: Option<String>,
}

impl MemoryCallableInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            failure: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Every `(name, data)` invoked so far, in order.
    pub async fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CallableInvoker for MemoryCallableInvoker {
    async fn call(&self, name: &str, data: Value) -> Result<String, PlatformError> {
        check(&self.failure)?;
        self.calls.lock().await.push((name.to_string(), data));
        Ok(r#"{"result":null}"#.to_string())
    }
}

// ---------------------------------------------------------------------------
// MemoryPlatform
// ---------------------------------------------------------------------------

/// One of each in-memory collaborator, kept typed so callers can inspect
/// what a run did after handing out the erased [`Platform`].
#[derive(Clone, Default)]
pub struct MemoryPlatform {
    pub realtime: Arc<MemoryRealtimeStore>,
    pub pubsub: Arc<MemoryPubSubTopic>,
    pub identity: Arc<MemoryIdentityDirectory>,
    pub documents: Arc<MemoryDocumentStore>,
    pub callable: Arc<MemoryCallableInvoker>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(&self) -> Platform {
        Platform {
            realtime: self.realtime.clone(),
            pubsub: self.pubsub.clone(),
            identity: self.identity.clone(),
            documents: self.documents.clone(),
            callable: self.callable.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn realtime_store_keeps_last_write() {
        let store = MemoryRealtimeStore::new();
        store.set("a/b", json!(1)).await.unwrap();
        store.set("a/b", json!(2)).await.unwrap();
        assert_eq!(store.get("a/b").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn failing_collaborators_reject_with_their_message() {
        assert_matches!(
            MemoryRealtimeStore::failing("denied").set("x", json!(null)).await,
            Err(PlatformError::Rejected(msg)) if msg == "denied"
        );
        assert_matches!(
            MemoryPubSubTopic::failing("nope").publish("t", &json!({})).await,
            Err(PlatformError::Rejected(_))
        );
        assert_matches!(
            MemoryCallableInvoker::failing("down").call("f", json!({})).await,
            Err(PlatformError::Rejected(_))
        );
    }

    #[tokio::test]
    async fn identity_create_then_delete() {
        let directory = MemoryIdentityDirectory::new();
        let user = directory
            .create_user(NewUser {
                email: "r@fake.com".into(),
                password: "secret".into(),
                display_name: "r".into(),
            })
            .await
            .unwrap();

        assert_eq!(user.uid, "uid-1");
        assert_eq!(directory.users().await.len(), 1);

        directory.delete_user(&user.uid).await.unwrap();
        assert!(directory.users().await.is_empty());
        assert_eq!(directory.deleted().await, vec!["uid-1".to_string()]);
    }

    #[tokio::test]
    async fn deleting_unknown_user_is_rejected() {
        let directory = MemoryIdentityDirectory::new();
        assert_matches!(
            directory.delete_user("ghost").await,
            Err(PlatformError::Rejected(_))
        );
    }

    #[tokio::test]
    async fn pubsub_assigns_sequential_ids() {
        let topic = MemoryPubSubTopic::new();
        assert_eq!(topic.publish("t", &json!({"n": 1})).await.unwrap(), "msg-1");
        assert_eq!(topic.publish("t", &json!({"n": 2})).await.unwrap(), "msg-2");
        assert_eq!(topic.published().await.len(), 2);
    }
}
