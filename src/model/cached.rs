use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

use super::{ChatModel, ChatRequest, ChatResponse, ModelError};
use crate::contexts::FileCache;
use crate::data::Cache;

/// Wraps a model with a persistent response cache.
///
/// Only tool-free exchanges are cached: tool-using conversations depend on
/// the state of the project on disk and must always reach the model.
pub struct CachedModel {
    inner: Arc<dyn ChatModel>,
    cache: FileCache,
}

impl CachedModel {
    /// Cache entries live under `{cache_dir}/{hash(model name)}/`.
    pub fn new(inner: Arc<dyn ChatModel>, cache_dir: PathBuf) -> Self {
        let model_hash = sha256_hex(inner.name());
        Self {
            cache: FileCache::new(Some(cache_dir), model_hash),
            inner,
        }
    }

    /// Cache key: hash of model name and serialized request, so a change to
    /// either one is a miss.
    fn cache_key(&self, request: &ChatRequest) -> String {
        let request_json = serde_json::to_string(request).unwrap_or_else(|_| "{}".to_string());
        sha256_hex(&format!("{}:{}", self.inner.name(), request_json))
    }
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ChatModel for CachedModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        if !request.tools.is_empty() {
            return self.inner.invoke(request).await;
        }

        let key = self.cache_key(request);
        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_str::<ChatResponse>(&cached) {
                Ok(response) => {
                    tracing::debug!(key = %key, "model response served from cache");
                    return Ok(response);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "ignoring unreadable cache entry"),
            }
        }

        let response = self.inner.invoke(request).await?;
        match serde_json::to_string(&response) {
            Ok(serialized) => self.cache.set(&key, &serialized),
            Err(e) => tracing::warn!(error = %e, "failed to serialize model response for cache"),
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Message, ToolDefinition};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatModel for CountingModel {
        fn name(&self) -> &str {
            "counting-model"
        }

        async fn invoke(&self, _request: &ChatRequest) -> Result<ChatResponse, ModelError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ChatResponse::text(format!("response {}", n)))
        }
    }

    #[tokio::test]
    async fn test_second_identical_request_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
        });
        let model = CachedModel::new(inner.clone(), dir.path().to_path_buf());
        let request = ChatRequest::new(vec![Message::user("refactor this")]);

        let first = model.invoke(&request).await.unwrap();
        let second = model.invoke(&request).await.unwrap();

        assert_eq!(first.text, "response 1");
        assert_eq!(second.text, "response 1");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tool_requests_bypass_cache() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
        });
        let model = CachedModel::new(inner.clone(), dir.path().to_path_buf());
        let request = ChatRequest::new(vec![Message::user("fix")]).with_tools(vec![ToolDefinition {
            name: "run_build".to_string(),
            description: "build".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }]);

        model.invoke(&request).await.unwrap();
        let second = model.invoke(&request).await.unwrap();

        assert_eq!(second.text, "response 2");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
