//! Chunk classification and record identity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;

/// Substring that marks a chunk as a function.
pub const FUNCTION_MARKER: &str = "def";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Function,
    Class,
}

impl ChunkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(Self::Function),
            "class" => Some(Self::Class),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides the [`ChunkKind`] of a chunk's text.
pub trait ChunkClassifier: Send + Sync {
    fn classify(&self, text: &str) -> ChunkKind;
}

/// `Function` whenever the marker occurs anywhere in the text, `Class` otherwise.
///
/// A class chunk that contains a method is therefore a function.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    function_marker: String,
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self {
            function_marker: FUNCTION_MARKER.to_owned(),
        }
    }
}

impl MarkerClassifier {
    #[must_use]
    pub fn new(function_marker: impl Into<String>) -> Self {
        Self {
            function_marker: function_marker.into(),
        }
    }
}

impl ChunkClassifier for MarkerClassifier {
    fn classify(&self, text: &str) -> ChunkKind {
        if text.contains(self.function_marker.as_str()) {
            ChunkKind::Function
        } else {
            ChunkKind::Class
        }
    }
}

/// A chunk with its identity and classification, the unit stored in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub sequence_index: usize,
    pub source_id: String,
    pub kind: ChunkKind,
}

const TEXT_KEY: &str = "text";
const FILE_KEY: &str = "file";
const CHUNK_ID_KEY: &str = "chunk_id";
const TYPE_KEY: &str = "type";

impl ChunkRecord {
    /// Store payload: chunk text plus `file`, `chunk_id` and `type` metadata.
    #[must_use]
    pub fn payload(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            (TEXT_KEY.to_owned(), serde_json::json!(self.text)),
            (FILE_KEY.to_owned(), serde_json::json!(self.source_id)),
            (CHUNK_ID_KEY.to_owned(), serde_json::json!(self.sequence_index)),
            (TYPE_KEY.to_owned(), serde_json::json!(self.kind.as_str())),
        ])
    }

    /// Rebuild a record from a stored id and payload.
    ///
    /// Returns `None` when the payload has no text. Missing metadata falls back
    /// to neutral values so foreign points still contribute context.
    #[must_use]
    pub fn from_payload(id: String, payload: &HashMap<String, serde_json::Value>) -> Option<Self> {
        let text = payload.get(TEXT_KEY)?.as_str()?.to_owned();
        let source_id = payload
            .get(FILE_KEY)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let sequence_index = payload
            .get(CHUNK_ID_KEY)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        let kind = payload
            .get(TYPE_KEY)
            .and_then(serde_json::Value::as_str)
            .and_then(ChunkKind::parse)
            .unwrap_or(ChunkKind::Class);
        Some(Self {
            id,
            text,
            sequence_index,
            source_id,
            kind,
        })
    }
}

/// Record id for the chunk at `sequence_index` of `source_id`.
#[must_use]
pub fn record_id(source_id: &str, sequence_index: usize) -> String {
    format!("{source_id}_{sequence_index}")
}

/// Attach ids and kinds to chunks, preserving order.
#[must_use]
pub fn assign_metadata(chunks: Vec<Chunk>, classifier: &dyn ChunkClassifier) -> Vec<ChunkRecord> {
    chunks
        .into_iter()
        .map(|chunk| ChunkRecord {
            id: record_id(&chunk.source_id, chunk.sequence_index),
            kind: classifier.classify(&chunk.text),
            text: chunk.text,
            sequence_index: chunk.sequence_index,
            source_id: chunk.source_id,
        })
        .collect()
}
