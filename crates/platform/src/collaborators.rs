//! Async traits for the five platform services a run touches.
//!
//! Implementations must be `Send + Sync` so they can be shared behind `Arc`
//! between concurrently issued stimuli and detached cleanup tasks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PlatformError;

/// Key-value realtime database.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Overwrite the value stored at `path`.
    async fn set(&self, path: &str, value: Value) -> Result<(), PlatformError>;
}

/// Publish/subscribe messaging.
#[async_trait]
pub trait PubSubTopic: Send + Sync {
    /// Publish one JSON message to `topic`, returning the message id.
    async fn publish(&self, topic: &str, payload: &Value) -> Result<String, PlatformError>;
}

/// Attributes for a new directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// A user as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "localId")]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

/// User-directory (authentication) service.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, PlatformError>;

    async fn delete_user(&self, uid: &str) -> Result<(), PlatformError>;
}

/// Document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or replace `collection/doc_id` with `document`.
    async fn set(&self, collection: &str, doc_id: &str, document: Value)
        -> Result<(), PlatformError>;
}

/// Request/response endpoint invocation.
#[async_trait]
pub trait CallableInvoker: Send + Sync {
    /// POST `{"data": data}` to the endpoint called `name` and return the
    /// raw response body.
    async fn call(&self, name: &str, data: Value) -> Result<String, PlatformError>;
}

/// The full set of collaborators one run fans out to.
#[derive(Clone)]
pub struct Platform {
    pub realtime: Arc<dyn RealtimeStore>,
    pub pubsub: Arc<dyn PubSubTopic>,
    pub identity: Arc<dyn IdentityDirectory>,
    pub documents: Arc<dyn DocumentStore>,
    pub callable: Arc<dyn CallableInvoker>,
}
