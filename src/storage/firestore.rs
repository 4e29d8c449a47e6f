use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, instrument};

use super::{CollectionPath, Document, DocumentStore, StoreError, WriteResult};
use crate::firebase::token::AccessTokenSource;

enum StoreAuth {
    ServiceAccount(Arc<AccessTokenSource>),
    Emulator,
}

/// Firestore over its REST API.
pub struct FirestoreStore {
    http: reqwest::Client,
    documents_url: String,
    auth: StoreAuth,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResponse {
    name: String,
    update_time: String,
}

impl FirestoreStore {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        project_id: &str,
        tokens: Arc<AccessTokenSource>,
    ) -> Self {
        Self {
            http,
            documents_url: documents_url(base_url, project_id),
            auth: StoreAuth::ServiceAccount(tokens),
        }
    }

    /// Talks to a local emulator at `host` (`host:port`); no OAuth exchange.
    pub fn emulator(http: reqwest::Client, host: &str, project_id: &str) -> Self {
        Self {
            http,
            documents_url: documents_url(&format!("http://{host}/v1"), project_id),
            auth: StoreAuth::Emulator,
        }
    }

    /// Appends each collection segment percent-escaped, so ids holding
    /// `?`, `#` or `%` stay literal.
    fn collection_url(&self, collection: &CollectionPath) -> Result<reqwest::Url, StoreError> {
        let mut url = reqwest::Url::parse(&self.documents_url)
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {e}", self.documents_url)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.documents_url.clone()))?
            .pop_if_empty()
            .extend(collection.segments());
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        match &self.auth {
            StoreAuth::ServiceAccount(tokens) => Ok(tokens.token().await?),
            StoreAuth::Emulator => Ok("owner".to_string()),
        }
    }
}

fn documents_url(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/projects/{}/databases/(default)/documents",
        base_url.trim_end_matches('/'),
        project_id
    )
}

/// Wraps a JSON value in Firestore's typed value representation.
fn encode_value(value: Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.into_iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_fields(fields: Document) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(k, v)| (k, encode_value(v)))
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self, fields), fields(collection = %collection))]
    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> Result<WriteResult, StoreError> {
        let url = self.collection_url(collection)?;
        let body = json!({ "fields": encode_fields(fields) });
        let bearer = self.bearer().await?;

        let res = self
            .http
            .post(url)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await
            .map_err(StoreError::Transport)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let doc: DocumentResponse = res.json().await.map_err(StoreError::Transport)?;
        let document_path = doc
            .name
            .split_once("/documents/")
            .map(|(_, path)| path.to_string())
            .ok_or_else(|| StoreError::Decode(format!("document name {:?}", doc.name)))?;
        let update_time = OffsetDateTime::parse(&doc.update_time, &Rfc3339)
            .map_err(|e| StoreError::Decode(format!("updateTime {:?}: {e}", doc.update_time)))?;

        debug!(path = %document_path, "document created");
        Ok(WriteResult {
            document_path,
            update_time,
        })
    }
}
