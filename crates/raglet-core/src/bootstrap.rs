//! Application bootstrap: config resolution, provider/store construction, pipeline assembly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use raglet_index::{
    IndexerConfig, ProviderComposer, ProviderEmbedder, RetrievalPipeline, SourceIndexer,
    StoreIndex,
};
use raglet_llm::openai::OpenAiProvider;
use raglet_memory::{LocalVectorStore, QdrantOps, VectorStore};

use crate::config::{Config, StoreBackend};
use crate::vault::{EnvVaultProvider, VaultProvider};

/// Indexer wired to the configured provider and store.
pub type AppIndexer = SourceIndexer<ProviderEmbedder<OpenAiProvider>, StoreIndex>;

/// Question-answering pipeline wired to the configured provider and store.
pub type AppPipeline =
    RetrievalPipeline<ProviderEmbedder<OpenAiProvider>, StoreIndex, ProviderComposer<OpenAiProvider>>;

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Load config from `config_path`, validate it and resolve secrets from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be read, parsed or validated.
    pub async fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        Self::load_with_vault(config_path, &EnvVaultProvider).await
    }

    /// Same as [`Self::load`] with an explicit secret backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the vault fails.
    pub async fn load_with_vault(
        config_path: PathBuf,
        vault: &dyn VaultProvider,
    ) -> anyhow::Result<Self> {
        let mut config = Config::load(&config_path)?;
        config.validate()?;
        config.resolve_secrets(vault).await?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            config_path: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    #[must_use]
    pub fn build_provider(&self) -> Arc<OpenAiProvider> {
        Arc::new(create_provider(&self.config))
    }

    /// # Errors
    ///
    /// Returns an error if the configured store backend cannot be created.
    pub fn build_store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        create_vector_store(&self.config)
    }

    /// # Errors
    ///
    /// Returns an error if the store backend cannot be created.
    pub fn build_indexer(&self) -> anyhow::Result<AppIndexer> {
        let provider = self.build_provider();
        let index = StoreIndex::new(self.build_store()?, &self.config.store.collection);
        Ok(SourceIndexer::new(
            ProviderEmbedder::new(provider),
            index,
            IndexerConfig {
                timeouts: self.config.timeouts.to_timeouts(),
                batch_size: self.config.index.batch_size,
            },
        ))
    }

    /// # Errors
    ///
    /// Returns an error if the store backend cannot be created.
    pub fn build_pipeline(&self) -> anyhow::Result<AppPipeline> {
        let provider = self.build_provider();
        let index = StoreIndex::new(self.build_store()?, &self.config.store.collection);
        Ok(RetrievalPipeline::new(
            ProviderEmbedder::new(Arc::clone(&provider)),
            index,
            ProviderComposer::new(provider),
            self.config.timeouts.to_timeouts(),
        ))
    }
}

/// Priority: `--config` value > `RAGLET_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("RAGLET_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// OpenAI-compatible provider for both chat and embeddings.
///
/// A missing API key yields an empty bearer token; the remote rejects it on
/// the first call.
#[must_use]
pub fn create_provider(config: &Config) -> OpenAiProvider {
    let api_key = config
        .secrets
        .openai_api_key
        .as_ref()
        .map(|s| s.expose().to_owned())
        .unwrap_or_default();
    OpenAiProvider::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
        Some(config.llm.embedding_model.clone()),
    )
}

/// # Errors
///
/// Returns an error if the Qdrant client cannot be created from the configured URL.
pub fn create_vector_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.store.backend {
        StoreBackend::Local => Arc::new(LocalVectorStore::new(&config.store.path)),
        StoreBackend::Qdrant => Arc::new(
            QdrantOps::new(&config.store.qdrant_url)
                .with_context(|| format!("invalid qdrant url {}", config.store.qdrant_url))?,
        ),
    };
    tracing::debug!(
        backend = config.store.backend.as_str(),
        collection = %config.store.collection,
        "vector store ready"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::vault::MockVaultProvider;

    #[test]
    #[serial]
    fn resolve_config_path_prefers_cli() {
        unsafe { std::env::set_var("RAGLET_CONFIG", "/from/env.toml") };
        let path = resolve_config_path(Some(Path::new("/from/cli.toml")));
        unsafe { std::env::remove_var("RAGLET_CONFIG") };
        assert_eq!(path, PathBuf::from("/from/cli.toml"));
    }

    #[test]
    #[serial]
    fn resolve_config_path_env_then_default() {
        unsafe { std::env::set_var("RAGLET_CONFIG", "/from/env.toml") };
        let from_env = resolve_config_path(None);
        unsafe { std::env::remove_var("RAGLET_CONFIG") };
        assert_eq!(from_env, PathBuf::from("/from/env.toml"));

        assert_eq!(resolve_config_path(None), PathBuf::from("config/default.toml"));
    }

    #[test]
    fn provider_uses_config_models() {
        let provider = create_provider(&Config::default());
        let debug = format!("{provider:?}");
        assert!(debug.contains("gpt-4-turbo"));
        assert!(debug.contains("text-embedding-3-small"));
    }

    #[test]
    fn local_store_is_default_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.path = dir.path().join("db").to_string_lossy().into_owned();
        assert!(create_vector_store(&config).is_ok());
        // created lazily on first upsert
        assert!(!dir.path().join("db").exists());
    }

    #[test]
    fn qdrant_backend_with_bad_url_fails() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Qdrant;
        config.store.qdrant_url = "not a valid url".into();
        let err = create_vector_store(&config).err().unwrap();
        assert!(err.to_string().contains("invalid qdrant url"));
    }

    #[tokio::test]
    #[serial]
    async fn load_with_vault_resolves_key_and_builds_pipelines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raglet.toml");
        std::fs::write(
            &path,
            format!(
                "[store]\npath = \"{}\"\n",
                dir.path().join("db").display()
            ),
        )
        .unwrap();

        let vault = MockVaultProvider::new().with_secret("OPENAI_API_KEY", "sk-test");
        let app = AppBuilder::load_with_vault(path.clone(), &vault)
            .await
            .unwrap();
        assert_eq!(app.config_path(), path);
        assert!(app.config().secrets.openai_api_key.is_some());
        assert!(app.build_indexer().is_ok());
        assert!(app.build_pipeline().is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn load_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raglet.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 0\n").unwrap();
        assert!(
            AppBuilder::load_with_vault(path, &MockVaultProvider::new())
                .await
                .is_err()
        );
    }
}
