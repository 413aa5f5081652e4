//! Vector index boundary and the Pinecone-style HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::document::ReferenceDocument;
use crate::error::RetrievalError;
use crate::filter::MetadataFilter;

pub const DEFAULT_NAMESPACE: &str = "default";

/// A vector similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: MetadataFilter,
    pub namespace: String,
}

impl SearchRequest {
    pub fn new(vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            vector,
            top_k,
            filter: MetadataFilter::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// A semantic retrieval service returning ranked reference excerpts.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(&self, request: &SearchRequest) -> Result<Vec<ReferenceDocument>, RetrievalError>;

    async fn health(&self) -> Result<(), RetrievalError>;
}

// ── Pinecone ──

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<Value>,
}

/// HTTP client for a Pinecone index host.
pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    api_key: String,
    timeout: Duration,
}

impl PineconeIndex {
    /// `host` is the index data-plane URL, e.g. `https://standards-abc123.svc.pinecone.io`.
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        let host: String = host.into();
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// POST `body` to `path` and decode the JSON reply. The deadline covers
    /// the whole exchange, body read included.
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, RetrievalError> {
        let url = format!("{}{path}", self.host);
        let call = async {
            let resp = self
                .client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .json(body)
                .send()
                .await?;
            let status = resp.status();
            let text = resp.text().await?;
            if !status.is_success() {
                return Err(RetrievalError::Server {
                    status: status.as_u16(),
                    body: text,
                });
            }
            Ok::<T, RetrievalError>(serde_json::from_str(&text)?)
        };
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| RetrievalError::Timeout)?
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, request: &SearchRequest) -> Result<Vec<ReferenceDocument>, RetrievalError> {
        let body = QueryBody {
            vector: &request.vector,
            top_k: request.top_k,
            include_metadata: true,
            namespace: &request.namespace,
            filter: request.filter.to_json(),
        };
        debug!(host = %self.host, top_k = request.top_k, "querying index");
        let parsed: QueryResponse = self.post("/query", &body).await?;
        let docs: Vec<ReferenceDocument> = parsed
            .matches
            .iter()
            .map(|m| ReferenceDocument::from_match(&m.id, m.score, m.metadata.as_ref()))
            .collect();
        info!(count = docs.len(), "retrieved reference excerpts");
        Ok(docs)
    }

    async fn health(&self) -> Result<(), RetrievalError> {
        self.post::<Value>("/describe_index_stats", &serde_json::json!({}))
            .await
            .map(|_| ())
    }
}
