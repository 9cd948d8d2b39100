use async_trait::async_trait;
use serde_json::{json, Value};

use super::RestClient;
use crate::collaborators::CallableInvoker;
use crate::config::PlatformConfig;
use crate::error::PlatformError;

/// Callable endpoints reached by a plain JSON POST.
pub struct RestCallableInvoker {
    client: RestClient,
    base_url: String,
}

impl RestCallableInvoker {
    pub fn new(client: RestClient, config: &PlatformConfig) -> Self {
        Self {
            client,
            base_url: config.callable_url.clone(),
        }
    }
}

#[async_trait]
impl CallableInvoker for RestCallableInvoker {
    async fn call(&self, name: &str, data: Value) -> Result<String, PlatformError> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self
            .client
            .send_unchecked(self.client.http().post(&url).json(&json!({ "data": data })))
            .await?;

        // The body belongs to the endpoint's own test; only log the status.
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "Callable endpoint answered non-2xx");
        }
        Ok(response.text().await?)
    }
}
