//! Environment-sourced configuration.
//!
//! Every knob defaults to a usable value so the engine can run without any
//! environment at all; `.env` files are honored via `dotenvy`.

use std::path::PathBuf;
use std::time::Duration;

/// Which chat-completion provider the answer generator dispatches to.
///
/// Selection happens once at construction, never per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Groq,
    /// No provider configured; the generator always falls back to the
    /// extractive answer.
    None,
}

impl ProviderKind {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "groq" => Self::Groq,
            _ => Self::None,
        }
    }
}

/// Runtime settings for the whole pipeline, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    // Embedding
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub embedding_api_base: String,
    pub embedding_api_key: Option<String>,
    pub embedding_batch_size: usize,

    // Chunking
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    // Retrieval
    pub vector_top_k: usize,
    pub keyword_top_k: usize,
    pub hybrid_top_k: usize,
    pub vector_weight: f32,
    pub keyword_weight: f32,

    // Generation
    pub llm_provider: ProviderKind,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,

    // Process
    pub request_timeout: Duration,
    pub index_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            embedding_model: "all-minilm".to_string(),
            embedding_dimension: 384,
            embedding_api_base: "http://localhost:11434/v1".to_string(),
            embedding_api_key: None,
            embedding_batch_size: 32,
            chunk_size: 800,
            chunk_overlap: 200,
            vector_top_k: 10,
            keyword_top_k: 10,
            hybrid_top_k: 5,
            vector_weight: 0.7,
            keyword_weight: 0.3,
            llm_provider: ProviderKind::None,
            llm_model: "llama-3.3-70b-versatile".to_string(),
            llm_temperature: 0.1,
            llm_max_tokens: 500,
            openai_api_key: None,
            groq_api_key: None,
            request_timeout: Duration::from_secs(30),
            index_dir: PathBuf::from("data/indexes"),
        }
    }
}

impl Settings {
    /// Resolves settings from the process environment, loading a `.env`
    /// file first if one is present. Unset or unparsable variables fall
    /// back to the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            embedding_model: var_or("EMBEDDING_MODEL", defaults.embedding_model),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", defaults.embedding_dimension),
            embedding_api_base: var_or("EMBEDDING_API_BASE", defaults.embedding_api_base),
            embedding_api_key: var_opt("EMBEDDING_API_KEY"),
            embedding_batch_size: parse_or("EMBEDDING_BATCH_SIZE", defaults.embedding_batch_size),
            chunk_size: parse_or("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: parse_or("CHUNK_OVERLAP", defaults.chunk_overlap),
            vector_top_k: parse_or("VECTOR_TOP_K", defaults.vector_top_k),
            keyword_top_k: parse_or("KEYWORD_TOP_K", defaults.keyword_top_k),
            hybrid_top_k: parse_or("HYBRID_TOP_K", defaults.hybrid_top_k),
            vector_weight: parse_or("VECTOR_WEIGHT", defaults.vector_weight),
            keyword_weight: parse_or("KEYWORD_WEIGHT", defaults.keyword_weight),
            llm_provider: std::env::var("LLM_PROVIDER")
                .map(|raw| ProviderKind::parse(&raw))
                .unwrap_or(defaults.llm_provider),
            llm_model: var_or("LLM_MODEL", defaults.llm_model),
            llm_temperature: parse_or("LLM_TEMPERATURE", defaults.llm_temperature),
            llm_max_tokens: parse_or("LLM_MAX_TOKENS", defaults.llm_max_tokens),
            openai_api_key: var_opt("OPENAI_API_KEY"),
            groq_api_key: var_opt("GROQ_API_KEY"),
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT",
                defaults.request_timeout.as_secs(),
            )),
            index_dir: var_opt("INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_dir),
        }
    }
}

fn var_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let settings = Settings::default();
        assert!(settings.chunk_overlap < settings.chunk_size);
        assert!(settings.hybrid_top_k <= settings.vector_top_k);
        assert_eq!(settings.llm_provider, ProviderKind::None);
    }

    #[test]
    fn provider_kind_parsing() {
        assert_eq!(ProviderKind::parse("openai"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::parse(" Groq "), ProviderKind::Groq);
        assert_eq!(ProviderKind::parse("bedrock"), ProviderKind::None);
        assert_eq!(ProviderKind::parse(""), ProviderKind::None);
    }
}
