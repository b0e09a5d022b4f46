//! Answer synthesis over retrieved context, with an extractive fallback.

use tracing::{info, warn};

use super::prompts::{format_context, rag_prompt, rag_prompt_with_citations};
use super::provider::GenerationProvider;
use crate::types::{Chunk, GeneratedAnswer, Source};

/// Answer returned when retrieval produced no context at all.
pub const NO_CONTEXT_ANSWER: &str = "No relevant information found in the knowledge base.";

/// Attribution string for answers assembled without a provider.
pub const FALLBACK_MODEL: &str = "fallback";

const SOURCE_PREVIEW_CHARS: usize = 200;
const FALLBACK_EXCERPT_CHARS: usize = 500;

const FALLBACK_DISCLAIMER: &str =
    "(No language model is configured; this is an excerpt from the most relevant source.)";

/// Turns retrieved chunks into a grounded answer.
///
/// With a configured provider the answer is synthesized from a prompt over
/// the context; without one, or when the provider call fails, the generator
/// degrades to an excerpt of the top-ranked chunk. Generation failures are
/// absorbed here and never surface to the query caller.
pub struct AnswerGenerator {
    provider: Option<Box<dyn GenerationProvider>>,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(
        provider: Option<Box<dyn GenerationProvider>>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Generates an answer over the given context chunks.
    ///
    /// Sources are attached in the chunks' ranked order regardless of which
    /// path produced the answer text, so callers can always trace the
    /// grounding.
    pub async fn generate(
        &self,
        query: &str,
        chunks: &[Chunk],
        use_citations: bool,
    ) -> GeneratedAnswer {
        if chunks.is_empty() {
            return GeneratedAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                model_used: FALLBACK_MODEL.to_string(),
            };
        }

        let sources = build_sources(chunks);

        if let Some(provider) = &self.provider {
            let context = format_context(chunks);
            let prompt = if use_citations {
                rag_prompt_with_citations(query, &context)
            } else {
                rag_prompt(query, &context)
            };

            match provider
                .complete(&prompt, self.temperature, self.max_tokens)
                .await
            {
                Ok(answer) => {
                    info!(provider = provider.name(), "answer synthesized");
                    return GeneratedAnswer {
                        answer,
                        sources,
                        model_used: format!("{}:{}", provider.name(), provider.model()),
                    };
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "generation failed, using extractive fallback");
                }
            }
        }

        GeneratedAnswer {
            answer: fallback_answer(&chunks[0]),
            sources,
            model_used: FALLBACK_MODEL.to_string(),
        }
    }
}

fn build_sources(chunks: &[Chunk]) -> Vec<Source> {
    chunks
        .iter()
        .map(|chunk| Source {
            content: truncate_chars(&chunk.content, SOURCE_PREVIEW_CHARS),
            metadata: chunk.metadata.clone(),
        })
        .collect()
}

/// Excerpt of the top-ranked chunk, prefixed with the source it came from,
/// plus a note that no model was involved.
fn fallback_answer(top: &Chunk) -> String {
    format!(
        "Based on the available information (from {}): {}\n\n{FALLBACK_DISCLAIMER}",
        top.metadata.source,
        truncate_chars(&top.content, FALLBACK_EXCERPT_CHARS)
    )
}

/// Truncates at a character boundary, appending an ellipsis only when
/// something was actually cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}
