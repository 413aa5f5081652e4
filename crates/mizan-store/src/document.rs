//! Reference excerpts returned by the retrieval service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ranked chunk of a reference standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub id: String,
    pub text: String,
    pub relevance_score: f32,
    pub document_type: String,
    pub section_heading: String,
    pub source: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
}

impl ReferenceDocument {
    /// Build from an index match. Missing metadata defaults to empty / zero;
    /// numeric metadata stored as floats is truncated.
    pub fn from_match(id: &str, score: f32, metadata: Option<&Value>) -> Self {
        let str_field = |keys: &[&str]| -> String {
            keys.iter()
                .find_map(|k| metadata.and_then(|m| m.get(*k)).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };
        let int_field = |key: &str| -> u32 {
            metadata
                .and_then(|m| m.get(key))
                .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(0)
        };

        Self {
            id: id.to_string(),
            text: str_field(&["text"]),
            relevance_score: score,
            document_type: str_field(&["document_type"]),
            section_heading: str_field(&["section_heading"]),
            source: str_field(&["source", "source_filename"]),
            chunk_index: int_field("chunk_index"),
            total_chunks: int_field("total_chunks"),
        }
    }

    /// The excerpt as shown to the summarizer, `rank` counted from 1.
    pub fn excerpt_block(&self, rank: usize) -> String {
        format!(
            "Document {rank} (Relevance: {:.2}):\nDocument Type: {}\nSection: {}\nSource: {}\nContent:\n{}",
            self.relevance_score, self.document_type, self.section_heading, self.source, self.text
        )
    }
}
