use async_trait::async_trait;
use serde_json::Value;

use super::RestClient;
use crate::collaborators::RealtimeStore;
use crate::config::PlatformConfig;
use crate::error::PlatformError;

/// Realtime database over its `PUT {path}.json` REST interface.
pub struct RestRealtimeStore {
    client: RestClient,
    base_url: String,
}

impl RestRealtimeStore {
    pub fn new(client: RestClient, config: &PlatformConfig) -> Self {
        Self {
            client,
            base_url: config.database_url.clone(),
        }
    }

    fn path_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

#[async_trait]
impl RealtimeStore for RestRealtimeStore {
    async fn set(&self, path: &str, value: Value) -> Result<(), PlatformError> {
        let url = self.path_url(path);
        tracing::debug!(%url, "Realtime store write");
        self.client
            .send(self.client.http().put(&url).json(&value))
            .await?;
        Ok(())
    }
}
