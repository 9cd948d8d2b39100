use async_trait::async_trait;
use serde_json::json;

use super::RestClient;
use crate::collaborators::{IdentityDirectory, NewUser, UserRecord};
use crate::config::PlatformConfig;
use crate::error::PlatformError;

/// User directory over the identity toolkit admin endpoints.
pub struct RestIdentityDirectory {
    client: RestClient,
    accounts_url: String,
}

impl RestIdentityDirectory {
    pub fn new(client: RestClient, config: &PlatformConfig) -> Self {
        Self {
            client,
            accounts_url: format!(
                "{}/v1/projects/{}/accounts",
                config.identity_url, config.project_id
            ),
        }
    }
}

#[async_trait]
impl IdentityDirectory for RestIdentityDirectory {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, PlatformError> {
        let response = self
            .client
            .send(self.client.http().post(&self.accounts_url).json(&user))
            .await?;
        Ok(response.json::<UserRecord>().await?)
    }

    async fn delete_user(&self, uid: &str) -> Result<(), PlatformError> {
        let url = format!("{}:delete", self.accounts_url);
        self.client
            .send(self.client.http().post(url).json(&json!({ "localId": uid })))
            .await?;
        Ok(())
    }
}
