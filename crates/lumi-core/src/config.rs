//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RETRIEVAL__TOP_K=8`) on top of
//! the built-in [`Settings`] defaults.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::chunker::ChunkingConfig;
use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Configuration from an inline TOML document, without files or env.
    pub fn from_toml_str(toml: &str) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed settings with defaults filled in and validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(self.figment.clone())
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub llm: LlmSettings,
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        self.chunking.validate()?;
        if !(1..=20).contains(&self.retrieval.top_k) {
            return Err(Error::InvalidConfig(format!("retrieval.top_k must be within 1..=20, got {}", self.retrieval.top_k)));
        }
        if self.retrieval.timeout_ms == 0 {
            return Err(Error::InvalidConfig("retrieval.timeout_ms must be greater than 0".into()));
        }
        if self.embedding.dim == 0 || self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.dim and embedding.batch_size must be greater than 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub use_rerank: bool,
    /// Bound on each embedding or rerank call.
    pub timeout_ms: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4, use_rerank: true, timeout_ms: 30_000 }
    }
}

impl RetrievalSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Directory with `config.json`, `tokenizer.json` and model weights.
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub max_len: usize,
    /// Dimension of the hashing embedder used without a model.
    pub dim: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, use_fake: false, max_len: 256, dim: 384, batch_size: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    /// Cross-encoder model directory; without it the embedding similarity scorer is used.
    pub model_dir: Option<String>,
    pub max_len: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self { model_dir: None, max_len: 512 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-70b-8192".to_string(),
            temperature: 0.5,
            max_tokens: 2048,
            max_retries: 3,
            timeout_secs: 15,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Config::from_toml_str("").settings().unwrap();
        assert_eq!(settings.chunking, ChunkingConfig { chunk_size: 1000, chunk_overlap: 200 });
        assert_eq!(settings.retrieval.top_k, 4);
        assert!(settings.retrieval.use_rerank);
        assert_eq!(settings.llm.max_retries, 3);
        assert_eq!(settings.llm.timeout(), Duration::from_secs(15));
        assert!(settings.embedding.model_dir.is_none());
    }

    #[test]
    fn toml_overrides_single_keys() {
        let config = Config::from_toml_str(
            r#"
            [retrieval]
            top_k = 8
            use_rerank = false

            [chunking]
            chunk_size = 500
            "#,
        );
        let settings = config.settings().unwrap();
        assert_eq!(settings.retrieval.top_k, 8);
        assert!(!settings.retrieval.use_rerank);
        assert_eq!(settings.retrieval.timeout_ms, 30_000);
        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.chunking.chunk_overlap, 200);
        assert_eq!(config.get::<usize>("retrieval.top_k").unwrap(), 8);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = Config::from_toml_str("[retrieval]\ntop_k = 50").settings().unwrap_err();
        assert!(err.to_string().contains("top_k"));
        let err = Config::from_toml_str("[chunking]\nchunk_size = 100\nchunk_overlap = 150").settings().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn expand_path_handles_env_vars() {
        std::env::set_var("LUMI_TEST_MODEL_ROOT", "/opt/models");
        assert_eq!(expand_path("${LUMI_TEST_MODEL_ROOT}/minilm"), PathBuf::from("/opt/models/minilm"));
    }
}
