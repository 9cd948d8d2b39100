use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::RestClient;
use crate::collaborators::DocumentStore;
use crate::config::PlatformConfig;
use crate::error::PlatformError;

/// Document store over the Firestore REST `documents` resource.
pub struct RestDocumentStore {
    client: RestClient,
    documents_url: String,
}

impl RestDocumentStore {
    pub fn new(client: RestClient, config: &PlatformConfig) -> Self {
        Self {
            client,
            documents_url: format!(
                "{}/v1/projects/{}/databases/(default)/documents",
                config.firestore_url, config.project_id
            ),
        }
    }
}

/// Encode a JSON value as a Firestore typed `Value`.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore carries 64-bit integers as strings.
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Encode a whole document. Only JSON objects are documents.
fn encode_document(document: &Value) -> Result<Value, PlatformError> {
    match document {
        Value::Object(map) => Ok(json!({ "fields": encode_fields(map) })),
        other => Err(PlatformError::Rejected(format!(
            "documents must be JSON objects, got {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn set(
        &self,
        collection: &str,
        doc_id: &str,
        document: Value,
    ) -> Result<(), PlatformError> {
        let body = encode_document(&document)?;
        let url = format!("{}/{}/{}", self.documents_url, collection, doc_id);
        self.client
            .send(self.client.http().patch(url).json(&body))
            .await?;
        Ok(())
    }
}
