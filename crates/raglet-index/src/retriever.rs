//! Retrieval-augmented answering: embed the question, fetch the nearest chunks,
//! compose an answer from them.

use crate::capability::{AnswerComposer, EmbeddingGateway, ScoredChunk, VectorIndex};
use crate::error::{RagError, Result};
use crate::timeouts::{self, Timeouts};

/// Chunks retrieved per question unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Stateless question-answering pipeline over injected capabilities.
pub struct RetrievalPipeline<E, V, A> {
    embedder: E,
    index: V,
    composer: A,
    timeouts: Timeouts,
}

impl<E, V, A> std::fmt::Debug for RetrievalPipeline<E, V, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl<E: EmbeddingGateway, V: VectorIndex, A: AnswerComposer> RetrievalPipeline<E, V, A> {
    #[must_use]
    pub fn new(embedder: E, index: V, composer: A, timeouts: Timeouts) -> Self {
        Self {
            embedder,
            index,
            composer,
            timeouts,
        }
    }

    /// Up to `k` chunks nearest to `question`, by descending score.
    ///
    /// Equal scores keep the order the index returned them in.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the question cannot be embedded and
    /// [`RagError::Index`] if the query fails.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let vector = timeouts::provider(self.timeouts.embedding, self.embedder.embed(question))
            .await
            .map_err(RagError::Embedding)?;

        let mut hits = timeouts::store(self.timeouts.store, self.index.query(vector, k)).await?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    /// Answer `question` from the `k` most relevant indexed chunks.
    ///
    /// The composer is called even when nothing was retrieved, with an empty
    /// context. Its output is returned as is.
    ///
    /// # Errors
    ///
    /// Returns the first failure among embedding, querying and composition.
    pub async fn answer_question(&self, question: &str, k: usize) -> Result<String> {
        let hits = self.retrieve(question, k).await?;
        tracing::info!(k, retrieved = hits.len(), "context retrieved");
        for hit in &hits {
            tracing::debug!(id = %hit.record.id, score = hit.score, "retrieved chunk");
        }

        let context = assemble_context(&hits);
        let answer = timeouts::provider(self.timeouts.llm, self.composer.compose(&context, question))
            .await
            .map_err(RagError::Composition)?;
        tracing::info!(answer_len = answer.len(), "answer composed");
        Ok(answer)
    }
}

/// Chunk texts in rank order, separated by a blank line.
#[must_use]
pub fn assemble_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| h.record.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
