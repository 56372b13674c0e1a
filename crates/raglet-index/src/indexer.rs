//! Indexing orchestrator: read → chunk → classify → embed → upsert.

use std::path::Path;

use raglet_llm::LlmError;

use crate::capability::{EmbeddingGateway, IndexedDocument, VectorIndex};
use crate::chunker::{BlankLineChunker, ChunkStrategy, chunk_source};
use crate::error::{RagError, Result};
use crate::metadata::{ChunkClassifier, ChunkKind, ChunkRecord, MarkerClassifier, assign_metadata};
use crate::timeouts::{self, Timeouts};

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub timeouts: Timeouts,
    /// Texts sent per embedding request.
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            batch_size: 64,
        }
    }
}

/// Summary of one indexing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub source_id: String,
    pub chunks_indexed: usize,
    pub function_chunks: usize,
    pub class_chunks: usize,
    pub duration_ms: u64,
}

/// Indexes source files into a [`VectorIndex`].
///
/// Embeddings for every chunk are computed before anything is written, so an
/// embedding failure leaves the index untouched. Re-indexing a source
/// overwrites its records by id.
pub struct SourceIndexer<E, V> {
    embedder: E,
    index: V,
    chunker: Box<dyn ChunkStrategy>,
    classifier: Box<dyn ChunkClassifier>,
    config: IndexerConfig,
}

impl<E, V> std::fmt::Debug for SourceIndexer<E, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceIndexer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: EmbeddingGateway, V: VectorIndex> SourceIndexer<E, V> {
    #[must_use]
    pub fn new(embedder: E, index: V, config: IndexerConfig) -> Self {
        Self {
            embedder,
            index,
            chunker: Box::new(BlankLineChunker::default()),
            classifier: Box::new(MarkerClassifier::default()),
            config,
        }
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: Box<dyn ChunkStrategy>) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn ChunkClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Index one file; its path as given becomes the source id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkInput`] if the file cannot be read, otherwise
    /// any error of [`Self::index_source`].
    pub async fn index_file(&self, path: &Path) -> Result<IndexReport> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RagError::ChunkInput {
                path: path.to_path_buf(),
                source,
            })?;
        self.index_source(&path.to_string_lossy(), &source).await
    }

    /// Chunk, classify, embed and upsert `text` under `source_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] or [`RagError::Index`] when the
    /// corresponding call fails or exceeds its timeout.
    pub async fn index_source(&self, source_id: &str, text: &str) -> Result<IndexReport> {
        let start = std::time::Instant::now();
        let chunks = chunk_source(self.chunker.as_ref(), source_id, text);
        let records = assign_metadata(chunks, self.classifier.as_ref());

        let total = records.len();
        tracing::info!(source = source_id, total, "indexing started");

        let mut report = IndexReport {
            source_id: source_id.to_owned(),
            function_chunks: records
                .iter()
                .filter(|r| r.kind == ChunkKind::Function)
                .count(),
            class_chunks: records.iter().filter(|r| r.kind == ChunkKind::Class).count(),
            ..IndexReport::default()
        };

        if records.is_empty() {
            tracing::info!(source = source_id, "no chunks found, nothing to index");
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        let documents = self.embed_records(records).await?;

        report.chunks_indexed = timeouts::store(
            self.config.timeouts.store,
            self.index.upsert(&documents),
        )
        .await?;
        report.duration_ms = elapsed_ms(start);

        tracing::info!(
            source = source_id,
            chunks = report.chunks_indexed,
            functions = report.function_chunks,
            classes = report.class_chunks,
            duration_ms = report.duration_ms,
            "indexing finished"
        );
        Ok(report)
    }

    async fn embed_records(&self, records: Vec<ChunkRecord>) -> Result<Vec<IndexedDocument>> {
        let batch_size = self.config.batch_size.max(1);
        let mut documents = Vec::with_capacity(records.len());
        let mut pending = records.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<ChunkRecord> = pending.by_ref().take(batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();

            let vectors = timeouts::provider(
                self.config.timeouts.embedding,
                self.embedder.embed_batch(&texts),
            )
            .await
            .map_err(RagError::Embedding)?;

            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(LlmError::Other(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                ))));
            }
            tracing::debug!(batch = batch.len(), "embedded chunk batch");

            documents.extend(
                batch
                    .into_iter()
                    .zip(vectors)
                    .map(|(record, vector)| IndexedDocument { record, vector }),
            );
        }
        Ok(documents)
    }
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
