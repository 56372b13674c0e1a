use std::time::Duration;

use serde::{Deserialize, Serialize};

use raglet_index::Timeouts;

use crate::vault::Secret;

/// Top-level configuration, loaded from TOML and overridden by `RAGLET_*` env vars.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4-turbo".into()
}

pub(crate) fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON snapshots in a local directory.
    #[default]
    Local,
    Qdrant,
}

impl StoreBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Qdrant => "qdrant",
        }
    }
}

fn default_store_path() -> String {
    "./raglet_db".into()
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_collection() -> String {
    "code_index".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            qdrant_url: default_qdrant_url(),
            collection: default_collection(),
        }
    }
}

fn default_batch_size() -> usize {
    64
}

fn default_target() -> String {
    "calculadora.py".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Chunk texts per embedding request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// File indexed when no path is given on the command line.
    #[serde(default = "default_target")]
    pub default_target: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_target: default_target(),
        }
    }
}

fn default_top_k() -> usize {
    raglet_index::DEFAULT_TOP_K
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_store_timeout() -> u64 {
    30
}

/// Per-call deadlines in seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_embedding_timeout")]
    pub embedding: u64,
    #[serde(default = "default_llm_timeout")]
    pub llm: u64,
    #[serde(default = "default_store_timeout")]
    pub store: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding: default_embedding_timeout(),
            llm: default_llm_timeout(),
            store: default_store_timeout(),
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn to_timeouts(self) -> Timeouts {
        Timeouts {
            embedding: Duration::from_secs(self.embedding),
            store: Duration::from_secs(self.store),
            llm: Duration::from_secs(self.llm),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
}
