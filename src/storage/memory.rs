use std::collections::BTreeMap;

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CollectionPath, Document, DocumentStore, StoreError, WriteResult};

const AUTO_ID_LEN: usize = 20;

/// In-process store keyed by full document path.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents directly under `collection`, ordered by path.
    pub async fn list(&self, collection: &CollectionPath) -> Vec<(String, Document)> {
        let prefix = format!("{}/", collection);
        self.docs
            .read()
            .await
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(path, doc)| (path.clone(), doc.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> Result<WriteResult, StoreError> {
        let mut docs = self.docs.write().await;
        let document_path = loop {
            let candidate = format!("{}/{}", collection, auto_id());
            if !docs.contains_key(&candidate) {
                break candidate;
            }
        };
        docs.insert(document_path.clone(), fields);
        debug!(path = %document_path, "document stored in memory");

        Ok(WriteResult {
            document_path,
            update_time: OffsetDateTime::now_utc(),
        })
    }
}
