use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_store();
        self.apply_env_overrides_retrieval();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("RAGLET_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("RAGLET_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("RAGLET_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("RAGLET_LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse::<u32>() {
                self.llm.max_tokens = n;
            } else {
                tracing::warn!("ignoring invalid RAGLET_LLM_MAX_TOKENS value: {v}");
            }
        }
    }

    fn apply_env_overrides_store(&mut self) {
        if let Ok(v) = std::env::var("RAGLET_STORE_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid RAGLET_STORE_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLET_STORE_PATH") {
            self.store.path = v;
        }
        if let Ok(v) = std::env::var("RAGLET_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("RAGLET_COLLECTION") {
            self.store.collection = v;
        }
    }

    fn apply_env_overrides_retrieval(&mut self) {
        if let Ok(v) = std::env::var("RAGLET_TOP_K") {
            if let Ok(k) = v.parse::<usize>() {
                self.retrieval.top_k = k;
            } else {
                tracing::warn!("ignoring invalid RAGLET_TOP_K value: {v}");
            }
        }
        for (key, slot) in [
            ("RAGLET_TIMEOUT_EMBEDDING", &mut self.timeouts.embedding),
            ("RAGLET_TIMEOUT_LLM", &mut self.timeouts.llm),
            ("RAGLET_TIMEOUT_STORE", &mut self.timeouts.store),
        ] {
            if let Ok(v) = std::env::var(key) {
                if let Ok(secs) = v.parse::<u64>() {
                    *slot = secs;
                } else {
                    tracing::warn!("ignoring invalid {key} value: {v}");
                }
            }
        }
    }
}
