//! Vector store abstraction with in-memory, local-directory, and Qdrant backends.

pub mod in_memory_store;
pub mod local_store;
pub mod qdrant_ops;
pub mod vector_store;

pub use in_memory_store::InMemoryVectorStore;
pub use local_store::LocalVectorStore;
pub use qdrant_ops::QdrantOps;
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
