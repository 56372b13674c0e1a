//! Error types for raglet-index.

use std::path::PathBuf;

use raglet_llm::LlmError;
use raglet_memory::VectorStoreError;

/// Failures of the index and ask pipelines. Each aborts the running pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// The source text could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ChunkInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The embedding gateway failed or timed out.
    #[error("embedding failed: {0}")]
    Embedding(#[source] LlmError),

    /// The vector index rejected an upsert or query.
    #[error("vector index error: {0}")]
    Index(#[from] VectorStoreError),

    /// The answer composer failed or timed out.
    #[error("answer composition failed: {0}")]
    Composition(#[source] LlmError),
}

/// Result type alias using `RagError`.
pub type Result<T> = std::result::Result<T, RagError>;
