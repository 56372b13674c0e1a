//! Code RAG pipeline: blank-line block chunking, chunk metadata, indexing into a
//! vector store, and retrieval-augmented answering.
//!
//! Embedding, storage, and generation are reached through the capability traits
//! in [`capability`] and injected by the caller.

pub mod capability;
pub mod chunker;
pub mod error;
pub mod indexer;
pub mod metadata;
pub mod retriever;
#[cfg(test)]
mod test_support;
pub mod timeouts;

pub use capability::{
    AnswerComposer, EmbeddingGateway, IndexedDocument, ProviderComposer, ProviderEmbedder,
    ScoredChunk, StoreIndex, VectorIndex,
};
pub use chunker::{BlankLineChunker, ChunkStrategy};
pub use error::{RagError, Result};
pub use indexer::{IndexReport, IndexerConfig, SourceIndexer};
pub use metadata::{ChunkClassifier, ChunkKind, ChunkRecord, MarkerClassifier};
pub use retriever::{DEFAULT_TOP_K, RetrievalPipeline};
pub use timeouts::Timeouts;
