//! Deadlines for calls to the embedding, store and chat backends.

use std::future::Future;
use std::time::Duration;

use raglet_llm::LlmError;
use raglet_memory::VectorStoreError;

/// Upper bounds for each kind of external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub embedding: Duration,
    pub store: Duration,
    pub llm: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            embedding: Duration::from_secs(30),
            store: Duration::from_secs(30),
            llm: Duration::from_secs(120),
        }
    }
}

/// Run a provider call (embedding or chat) under `limit`.
pub(crate) async fn provider<T, F>(limit: Duration, fut: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(LlmError::Timeout(limit.as_secs())))
}

/// Run `fut` with a vector-store deadline.
pub(crate) async fn store<T, F>(limit: Duration, fut: F) -> Result<T, VectorStoreError>
where
    F: Future<Output = Result<T, VectorStoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(VectorStoreError::Timeout(limit.as_secs())))
}
