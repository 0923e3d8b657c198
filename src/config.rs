//! TOML configuration.
//!
//! All collaborator settings live in one file passed with `--config`.
//! Secrets (API keys) are never read from the file; providers take them from
//! the environment when they are constructed.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub images: ImagesConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImagesConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            api_base: None,
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "gemini".to_string()
}
fn default_generation_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_top_k() -> u32 {
    40
}
fn default_top_p() -> f32 {
    0.95
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Gemini task type, e.g. `SEMANTIC_SIMILARITY`.
    #[serde(default = "default_task_type")]
    pub task_type: String,
    /// Base URL for the Gemini or Ollama API.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            task_type: default_task_type(),
            url: None,
            max_retries: 0,
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_task_type() -> String {
    "SEMANTIC_SIMILARITY".to_string()
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorConfig {
    /// `"chroma"` or `"memory"`.
    #[serde(default = "default_vector_backend")]
    pub backend: String,
    #[serde(default = "default_chroma_url")]
    pub url: String,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_vector_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            url: default_chroma_url(),
            tenant: default_tenant(),
            database: default_database(),
            collection: default_collection(),
            timeout_secs: default_vector_timeout_secs(),
        }
    }
}

fn default_vector_backend() -> String {
    "chroma".to_string()
}
fn default_chroma_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_tenant() -> String {
    "default_tenant".to_string()
}
fn default_database() -> String {
    "default_database".to_string()
}
fn default_collection() -> String {
    "project-screens".to_string()
}
fn default_vector_timeout_secs() -> u64 {
    30
}

/// What to do when the vector index cannot be queried.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalFailurePolicy {
    /// Fail the run with `ContextRetrievalFailed`.
    #[default]
    Abort,
    /// Log a warning and analyze without context.
    EmptyContext,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_query")]
    pub default_query: String,
    #[serde(default)]
    pub on_failure: RetrievalFailurePolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            default_query: default_query(),
            on_failure: RetrievalFailurePolicy::Abort,
        }
    }
}

fn default_k() -> usize {
    reqforge_core::retrieve::DEFAULT_K
}
fn default_query() -> String {
    reqforge_core::retrieve::DEFAULT_QUERY.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Upper bound on any single collaborator call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

fn default_call_timeout_secs() -> u64 {
    120
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate generation
    if config.generation.provider != "gemini" {
        anyhow::bail!(
            "Unknown generation provider: '{}'. Must be gemini.",
            config.generation.provider
        );
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }
    if !(0.0..=1.0).contains(&config.generation.top_p) {
        anyhow::bail!("generation.top_p must be in [0.0, 1.0]");
    }
    if config.generation.top_k == 0 {
        anyhow::bail!("generation.top_k must be >= 1");
    }

    // Validate retrieval
    if !(2..=3).contains(&config.retrieval.k) {
        anyhow::bail!("retrieval.k must be 2 or 3");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "gemini" | "openai" | "ollama" | "hash" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, gemini, openai, ollama, or hash.",
            other
        ),
    }
    if matches!(config.embedding.provider.as_str(), "openai" | "ollama") {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    // Validate vector backend
    match config.vector.backend.as_str() {
        "chroma" | "memory" => {}
        other => anyhow::bail!(
            "Unknown vector backend: '{}'. Must be chroma or memory.",
            other
        ),
    }
    if config.vector.backend == "chroma" && !config.embedding.is_enabled() {
        anyhow::bail!("vector.backend = \"chroma\" requires an embedding provider");
    }

    if config.pipeline.call_timeout_secs == 0 {
        anyhow::bail!("pipeline.call_timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[db]
path = "./data/reqforge.sqlite"

[images]
root = "./data/images"

[embedding]
provider = "gemini"
"#;

    #[test]
    fn test_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.generation.model, "gemini-2.5-flash");
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.generation.top_k, 40);
        assert!((config.generation.top_p - 0.95).abs() < f32::EPSILON);
        assert_eq!(config.vector.backend, "chroma");
        assert_eq!(config.vector.collection, "project-screens");
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.retrieval.default_query, "screenName");
        assert_eq!(config.retrieval.on_failure, RetrievalFailurePolicy::Abort);
        assert_eq!(config.embedding.task_type, "SEMANTIC_SIMILARITY");
        assert_eq!(config.embedding.max_retries, 0);
    }

    #[test]
    fn test_on_failure_empty_context() {
        let text = format!("{}\n[retrieval]\nk = 2\non_failure = \"empty_context\"\n", MINIMAL);
        let config = parse_config(&text).unwrap();
        assert_eq!(config.retrieval.k, 2);
        assert_eq!(
            config.retrieval.on_failure,
            RetrievalFailurePolicy::EmptyContext
        );
    }

    #[test]
    fn test_rejects_unknown_embedding_provider() {
        let text = MINIMAL.replace("\"gemini\"", "\"cohere\"");
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_chroma_requires_embeddings() {
        let text = MINIMAL.replace("provider = \"gemini\"", "provider = \"disabled\"");
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("requires an embedding provider"));
    }

    #[test]
    fn test_memory_backend_without_embeddings_is_allowed() {
        let text = format!(
            "{}\n[vector]\nbackend = \"memory\"\n",
            MINIMAL.replace("provider = \"gemini\"", "provider = \"disabled\"")
        );
        let config = parse_config(&text).unwrap();
        assert_eq!(config.vector.backend, "memory");
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn test_rejects_k_outside_two_to_three() {
        for k in [0, 1, 4, 10] {
            let text = format!("{}\n[retrieval]\nk = {}\n", MINIMAL, k);
            let err = parse_config(&text).unwrap_err();
            assert!(err.to_string().contains("retrieval.k"), "k = {}", k);
        }
        for k in [2, 3] {
            let text = format!("{}\n[retrieval]\nk = {}\n", MINIMAL, k);
            assert_eq!(parse_config(&text).unwrap().retrieval.k, k);
        }
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../config/reqforge.example.toml")).unwrap();
        assert_eq!(config.embedding.dims, Some(768));
        assert_eq!(config.pipeline.call_timeout_secs, 120);
    }

    #[test]
    fn test_openai_requires_model_and_dims() {
        let text = MINIMAL.replace("\"gemini\"", "\"openai\"");
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }
}
