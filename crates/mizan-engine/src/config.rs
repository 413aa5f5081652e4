//! Engine configuration.

use std::time::Duration;

use mizan_ai::ModelSettings;
use serde::{Deserialize, Serialize};

/// Settings for one [`crate::Advisor`]. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub models: ModelSettings,
    /// Cap on simultaneous diagnostic calls to the inference service.
    pub max_concurrency: usize,
    pub call_timeout_secs: u64,
    /// Retries for transient inference failures.
    pub inference_retries: u32,
    pub retry_backoff_ms: u64,
    pub retrieval_top_k: usize,
    pub retrieval_namespace: Option<String>,
    /// Summarize retrieved excerpts before drafting instead of passing them raw.
    pub summarize_excerpts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models: ModelSettings::default(),
            max_concurrency: 4,
            call_timeout_secs: 60,
            inference_retries: 2,
            retry_backoff_ms: 500,
            retrieval_top_k: 5,
            retrieval_namespace: None,
            summarize_excerpts: true,
        }
    }
}

impl EngineConfig {
    pub fn with_models(mut self, models: ModelSettings) -> Self {
        self.models = models;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn with_call_timeout(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    pub fn with_retrieval_top_k(mut self, k: usize) -> Self {
        self.retrieval_top_k = k;
        self
    }

    pub fn with_summarized_excerpts(mut self, on: bool) -> Self {
        self.summarize_excerpts = on;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Pool size, never zero.
    pub fn pool_size(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.max_concurrency, 4);
        assert_eq!(c.call_timeout(), Duration::from_secs(60));
        assert_eq!(c.retrieval_top_k, 5);
        assert!(c.summarize_excerpts);
        assert_eq!(c.models.temperature, 0.2);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: EngineConfig =
            serde_json::from_str(r#"{"max_concurrency": 8, "models": {"default_model": "gpt-4o-mini"}}"#)
                .unwrap();
        assert_eq!(c.max_concurrency, 8);
        assert_eq!(c.models.default_model, "gpt-4o-mini");
        assert_eq!(c.models.compliance_model, "gpt-4.1-mini");
        assert_eq!(c.inference_retries, 2);
    }

    #[test]
    fn builders_override_defaults() {
        let c = EngineConfig::default()
            .with_retrieval_top_k(8)
            .with_summarized_excerpts(false);
        assert_eq!(c.retrieval_top_k, 8);
        assert!(!c.summarize_excerpts);
    }

    #[test]
    fn zero_concurrency_still_has_one_slot() {
        assert_eq!(EngineConfig::default().with_max_concurrency(0).pool_size(), 1);
    }
}
