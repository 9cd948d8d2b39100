//! REST adapters for the platform services.
//!
//! Every adapter shares one [`RestClient`], which owns the pooled
//! `reqwest::Client`, attaches the configured bearer token and turns
//! non-2xx answers into [`PlatformError::HttpStatus`].

pub mod callable;
pub mod firestore;
pub mod identity;
pub mod pubsub;
pub mod realtime;
pub mod sse;
pub mod verdicts;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, Response};

use crate::collaborators::Platform;
use crate::config::PlatformConfig;
use crate::error::PlatformError;

pub use callable::RestCallableInvoker;
pub use firestore::RestDocumentStore;
pub use identity::RestIdentityDirectory;
pub use pubsub::RestPubSubTopic;
pub use realtime::RestRealtimeStore;
pub use verdicts::RealtimeVerdictSource;

/// HTTP request timeout for a single platform call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP plumbing for the REST adapters. Cheap to clone.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    access_token: Option<String>,
}

impl RestClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            access_token: config.access_token.clone(),
        })
    }

    /// A client for long-lived streaming reads: only connecting is bounded.
    pub fn streaming(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            access_token: config.access_token.clone(),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send `request` and require a 2xx answer.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Send `request` without interpreting the status code.
    pub(crate) async fn send_unchecked(
        &self,
        request: RequestBuilder,
    ) -> Result<Response, PlatformError> {
        Ok(self.authorize(request).send().await?)
    }
}

/// Wire every collaborator to its REST adapter over one shared client.
pub fn platform(config: &PlatformConfig) -> Result<Platform, PlatformError> {
    let client = RestClient::new(config)?;
    Ok(Platform {
        realtime: Arc::new(RestRealtimeStore::new(client.clone(), config)),
        pubsub: Arc::new(RestPubSubTopic::new(client.clone(), config)),
        identity: Arc::new(RestIdentityDirectory::new(client.clone(), config)),
        documents: Arc::new(RestDocumentStore::new(client.clone(), config)),
        callable: Arc::new(RestCallableInvoker::new(client, config)),
    })
}
