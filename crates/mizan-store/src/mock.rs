//! In-memory vector index for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::document::ReferenceDocument;
use crate::error::RetrievalError;
use crate::index::{SearchRequest, VectorIndex};

/// Returns the same documents for every query, or fails when offline.
pub struct StaticIndex {
    documents: Vec<ReferenceDocument>,
    offline: bool,
    requests: Mutex<Vec<SearchRequest>>,
}

impl StaticIndex {
    pub fn new(texts: &[&str]) -> Self {
        let documents = texts
            .iter()
            .enumerate()
            .map(|(i, text)| ReferenceDocument {
                id: format!("doc-{i}"),
                text: text.to_string(),
                relevance_score: 1.0 - i as f32 * 0.1,
                document_type: "SS".into(),
                section_heading: String::new(),
                source: "static".into(),
                chunk_index: i as u32,
                total_chunks: texts.len() as u32,
            })
            .collect();
        Self {
            documents,
            offline: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An index whose every call fails.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::new(&[])
        }
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn query(&self, request: &SearchRequest) -> Result<Vec<ReferenceDocument>, RetrievalError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.offline {
            return Err(RetrievalError::Other("index offline".into()));
        }
        Ok(self.documents.iter().take(request.top_k).cloned().collect())
    }

    async fn health(&self) -> Result<(), RetrievalError> {
        if self.offline {
            Err(RetrievalError::Other("index offline".into()))
        } else {
            Ok(())
        }
    }
}
