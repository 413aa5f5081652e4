//! Retrieval layer: reference excerpts, metadata filters, and the vector index client.

mod document;
mod error;
mod filter;
mod index;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use document::ReferenceDocument;
pub use error::RetrievalError;
pub use filter::MetadataFilter;
pub use index::{DEFAULT_NAMESPACE, PineconeIndex, SearchRequest, VectorIndex};
