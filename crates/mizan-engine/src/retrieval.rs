//! Text-to-excerpts retrieval: embed the query, then search the index.

use std::sync::Arc;

use mizan_ai::Embedder;
use mizan_store::{
    DEFAULT_NAMESPACE, MetadataFilter, ReferenceDocument, RetrievalError, SearchRequest,
    VectorIndex,
};
use tracing::debug;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    namespace: String,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Top-k excerpts for `text`.
    pub async fn retrieve(
        &self,
        text: &str,
        filter: &MetadataFilter,
    ) -> Result<Vec<ReferenceDocument>, RetrievalError> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        let request = SearchRequest::new(vector, self.top_k)
            .with_filter(filter.clone())
            .with_namespace(self.namespace.clone());
        let docs = self.index.query(&request).await?;
        debug!(count = docs.len(), top_k = self.top_k, "retrieval complete");
        Ok(docs)
    }

    /// Top-k excerpts for keywords joined into one query.
    pub async fn retrieve_by_keywords(
        &self,
        keywords: &[&str],
        filter: &MetadataFilter,
    ) -> Result<Vec<ReferenceDocument>, RetrievalError> {
        self.retrieve(&keywords.join(" "), filter).await
    }

    pub async fn health(&self) -> Result<(), RetrievalError> {
        self.index.health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_ai::mock::ScriptedInference;
    use mizan_store::mock::StaticIndex;

    #[tokio::test]
    async fn retrieve_caps_at_top_k() {
        let index = Arc::new(StaticIndex::new(&["a", "b", "c"]));
        let retriever = Retriever::new(Arc::new(ScriptedInference::new()), index.clone(), 2);
        let docs = retriever
            .retrieve("late payment", &MetadataFilter::new().document_type("SS"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        let req = &index.requests()[0];
        assert_eq!(req.namespace, "default");
        assert_eq!(req.filter.document_types, vec!["SS"]);
    }

    #[tokio::test]
    async fn keywords_are_joined() {
        let index = Arc::new(StaticIndex::new(&["a"]));
        let retriever = Retriever::new(Arc::new(ScriptedInference::new()), index.clone(), 5)
            .with_namespace("standards");
        retriever
            .retrieve_by_keywords(&["murabaha", "penalty"], &MetadataFilter::new())
            .await
            .unwrap();
        let req = &index.requests()[0];
        // The scripted embedder encodes the query length in the first component.
        assert_eq!(req.vector[0], "murabaha penalty".len() as f32);
        assert_eq!(req.namespace, "standards");
    }

    #[tokio::test]
    async fn embedding_failure_is_retrieval_error() {
        let retriever = Retriever::new(
            Arc::new(ScriptedInference::new().unhealthy()),
            Arc::new(StaticIndex::new(&["a"])),
            5,
        );
        let err = retriever.retrieve("x", &MetadataFilter::new()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }
}
