use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("query embedding failed: {0}")]
    Embedding(String),

    #[error("index call timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl RetrievalError {
    /// Stable error taxonomy label.
    pub fn label(&self) -> &'static str {
        "RetrievalError"
    }
}
