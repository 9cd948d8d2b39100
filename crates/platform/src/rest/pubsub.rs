use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use super::RestClient;
use crate::collaborators::PubSubTopic;
use crate::config::PlatformConfig;
use crate::error::PlatformError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Pub/Sub topic publishing over `topics/{topic}:publish`.
pub struct RestPubSubTopic {
    client: RestClient,
    base_url: String,
    project_id: String,
}

impl RestPubSubTopic {
    pub fn new(client: RestClient, config: &PlatformConfig) -> Self {
        Self {
            client,
            base_url: config.pubsub_url.clone(),
            project_id: config.project_id.clone(),
        }
    }

    fn publish_url(&self, topic: &str) -> String {
        format!(
            "{}/v1/projects/{}/topics/{}:publish",
            self.base_url, self.project_id, topic
        )
    }
}

/// Wrap a JSON payload in the publish request envelope.
fn publish_body(payload: &Value) -> Result<Value, PlatformError> {
    let data = STANDARD.encode(serde_json::to_vec(payload)?);
    Ok(json!({ "messages": [{ "data": data }] }))
}

#[async_trait]
impl PubSubTopic for RestPubSubTopic {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<String, PlatformError> {
        let body = publish_body(payload)?;
        let response = self
            .client
            .send(self.client.http().post(self.publish_url(topic)).json(&body))
            .await?;

        let parsed: PublishResponse = response.json().await?;
        parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::Rejected(format!("no message id returned for {topic}")))
    }
}
