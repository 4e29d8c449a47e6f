use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::firebase::token::TokenError;

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

/// Field map of a single document.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path segment {0:?}")]
    InvalidPath(String),
    #[error("invalid store url: {0}")]
    InvalidUrl(String),
    #[error("store request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("store answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
    #[error("store credentials: {0}")]
    Credentials(#[from] TokenError),
}

/// Slash-separated path to a collection, e.g. `users/u123/meals`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Builds a path from alternating collection/document ids; the last
    /// segment must name a collection.
    pub fn new<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts = Vec::new();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() || segment.contains('/') {
                return Err(StoreError::InvalidPath(segment.to_string()));
            }
            parts.push(segment.to_string());
        }
        if parts.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(parts.join("/")));
        }
        Ok(Self(parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unescaped path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Full path of the created document, `{collection}/{id}`.
    pub document_path: String,
    pub update_time: OffsetDateTime,
}

impl WriteResult {
    pub fn document_id(&self) -> &str {
        self.document_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.document_path)
    }

    pub fn update_time_rfc3339(&self) -> String {
        self.update_time
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.update_time.to_string())
    }
}

/// Hierarchical document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a new document with a store-assigned id under `collection`.
    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> Result<WriteResult, StoreError>;
}
