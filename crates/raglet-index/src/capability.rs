//! Capabilities the pipelines depend on, and adapters over the provider and store crates.

use std::future::Future;
use std::sync::Arc;

use raglet_llm::{LlmError, LlmProvider, Message};
use raglet_memory::{VectorPoint, VectorStore, VectorStoreError};

use crate::metadata::ChunkRecord;

pub const SYSTEM_PROMPT: &str =
    "You are an assistant that answers technical questions based on the provided code.";

/// Turns text into a fixed-length vector.
pub trait EmbeddingGateway: Send + Sync {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed several texts; output order matches input order.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }
}

/// Persistent store of embedded chunk records.
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite documents by record id. Returns how many were written.
    fn upsert(
        &self,
        documents: &[IndexedDocument],
    ) -> impl Future<Output = Result<usize, VectorStoreError>> + Send;

    /// Up to `k` records nearest to `vector`, best first.
    fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
    ) -> impl Future<Output = Result<Vec<ScoredChunk>, VectorStoreError>> + Send;
}

/// Produces an answer from retrieved context and a question.
pub trait AnswerComposer: Send + Sync {
    fn compose(
        &self,
        context: &str,
        question: &str,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

impl<T: EmbeddingGateway> EmbeddingGateway for Arc<T> {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send {
        (**self).embed(text)
    }

    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        (**self).embed_batch(texts)
    }
}

impl<T: VectorIndex> VectorIndex for Arc<T> {
    fn upsert(
        &self,
        documents: &[IndexedDocument],
    ) -> impl Future<Output = Result<usize, VectorStoreError>> + Send {
        (**self).upsert(documents)
    }

    fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
    ) -> impl Future<Output = Result<Vec<ScoredChunk>, VectorStoreError>> + Send {
        (**self).query(vector, k)
    }
}

impl<T: AnswerComposer> AnswerComposer for Arc<T> {
    fn compose(
        &self,
        context: &str,
        question: &str,
    ) -> impl Future<Output = Result<String, LlmError>> + Send {
        (**self).compose(context, question)
    }
}

#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub record: ChunkRecord,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub score: f32,
}

/// Embedding backed by an [`LlmProvider`].
#[derive(Debug)]
pub struct ProviderEmbedder<P> {
    provider: Arc<P>,
}

impl<P> ProviderEmbedder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P: LlmProvider> EmbeddingGateway for ProviderEmbedder<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.provider.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.provider.embed_batch(texts).await
    }
}

/// Chat-completion answer composer backed by an [`LlmProvider`].
#[derive(Debug)]
pub struct ProviderComposer<P> {
    provider: Arc<P>,
}

impl<P> ProviderComposer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

/// Messages sent to the chat model for one question.
#[must_use]
pub fn answer_prompt(context: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!("Context:\n{context}\n\nQuestion: {question}")),
    ]
}

impl<P: LlmProvider> AnswerComposer for ProviderComposer<P> {
    async fn compose(&self, context: &str, question: &str) -> Result<String, LlmError> {
        self.provider.chat(&answer_prompt(context, question)).await
    }
}

/// [`VectorIndex`] over one collection of a [`VectorStore`].
///
/// The collection is created on the first upsert with the dimension of the
/// first vector. Querying a collection that does not exist yet yields no hits.
pub struct StoreIndex {
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl std::fmt::Debug for StoreIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreIndex")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl StoreIndex {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl VectorIndex for StoreIndex {
    async fn upsert(&self, documents: &[IndexedDocument]) -> Result<usize, VectorStoreError> {
        let Some(first) = documents.first() else {
            return Ok(0);
        };
        self.store
            .ensure_collection(&self.collection, first.vector.len() as u64)
            .await?;

        let points = documents
            .iter()
            .map(|doc| VectorPoint {
                id: doc.record.id.clone(),
                vector: doc.vector.clone(),
                payload: doc.record.payload(),
            })
            .collect();
        self.store.upsert(&self.collection, points).await?;
        Ok(documents.len())
    }

    async fn query(&self, vector: Vec<f32>, k: usize) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        if k == 0 || !self.store.collection_exists(&self.collection).await? {
            return Ok(Vec::new());
        }
        let hits = self
            .store
            .search(&self.collection, vector, k as u64)
            .await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let score = hit.score;
                let record = ChunkRecord::from_payload(hit.id.clone(), &hit.payload);
                if record.is_none() {
                    tracing::warn!(id = %hit.id, "stored point has no text payload, skipping");
                }
                record.map(|record| ScoredChunk { record, score })
            })
            .collect())
    }
}
