//! Chat-completion providers behind one trait.
//!
//! Both concrete providers speak the OpenAI-compatible
//! `/chat/completions` surface, so they share one HTTP client wrapper and
//! differ only in base URL, system prompt, and credentials.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::{ProviderKind, Settings};
use crate::error::{RagError, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

const OPENAI_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions based on provided context.";
const GROQ_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions \
     based on provided context. Be concise and accurate.";

/// Text-completion capability of one configured provider and model.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short provider tag used in the `"provider:model"` attribution string.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Completes the prompt. Any failure maps to [`RagError::Generation`];
    /// the caller decides whether to fall back.
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String>;
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Shared OpenAI-compatible chat client.
struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: &'static str,
}

impl ChatClient {
    fn new(
        base_url: &str,
        api_key: String,
        model: String,
        system_prompt: &'static str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Generation(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            system_prompt,
        })
    }

    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": prompt},
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!(
                "chat completion returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("malformed chat response: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Generation("chat response had no choices".to_string()))?;
        Ok(choice.message.content.trim().to_string())
    }
}

/// OpenAI chat-completion provider.
pub struct OpenAiProvider {
    inner: ChatClient,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(OPENAI_API_BASE, api_key, model, timeout)
    }

    /// Same provider against a different endpoint, for local gateways and
    /// tests.
    pub fn with_base_url(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            inner: ChatClient::new(base_url, api_key, model, OPENAI_SYSTEM_PROMPT, timeout)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.inner.model
    }

    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        self.inner.complete(prompt, temperature, max_tokens).await
    }
}

/// Groq chat-completion provider (OpenAI-compatible API surface).
pub struct GroqProvider {
    inner: ChatClient,
}

impl GroqProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(GROQ_API_BASE, api_key, model, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            inner: ChatClient::new(base_url, api_key, model, GROQ_SYSTEM_PROMPT, timeout)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.inner.model
    }

    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        self.inner.complete(prompt, temperature, max_tokens).await
    }
}

/// Resolves the configured provider, if any. A selected provider missing
/// its API key resolves to `None` rather than failing at startup; the
/// generator then runs in fallback-only mode.
pub fn provider_from_settings(settings: &Settings) -> Result<Option<Box<dyn GenerationProvider>>> {
    match settings.llm_provider {
        ProviderKind::OpenAi => match &settings.openai_api_key {
            Some(key) => Ok(Some(Box::new(OpenAiProvider::new(
                key.clone(),
                settings.llm_model.clone(),
                settings.request_timeout,
            )?))),
            None => Ok(None),
        },
        ProviderKind::Groq => match &settings.groq_api_key {
            Some(key) => Ok(Some(Box::new(GroqProvider::new(
                key.clone(),
                settings.llm_model.clone(),
                settings.request_timeout,
            )?))),
            None => Ok(None),
        },
        ProviderKind::None => Ok(None),
    }
}
