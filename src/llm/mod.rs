//! Grounded answer generation.
//!
//! * [`prompts`] — context formatting and prompt templates.
//! * [`provider`] — chat-completion providers behind one trait.
//! * [`generator`] — synthesis with an extractive fallback.

pub mod generator;
pub mod prompts;
pub mod provider;

pub use generator::{AnswerGenerator, FALLBACK_MODEL, NO_CONTEXT_ANSWER};
pub use provider::{provider_from_settings, GenerationProvider, GroqProvider, OpenAiProvider};
