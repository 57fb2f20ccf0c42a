//! LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::LlmProvider`] trait for OpenAI-compatible
//! chat-completions APIs. Other providers are added as new `impl` blocks in
//! this crate without any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response parsing,
//! and mapping of HTTP failures onto [`pipeline::LlmError`] live here. The
//! [`pipeline`] crate sees only [`pipeline::LlmProvider`].
//!
//! The adapter never retries. Every error carries enough information
//! (`Retry-After`, status) for the caller to apply its own policy.

pub mod config;
pub mod openai;
mod wire;

pub use config::{ProviderConfig, ProviderError, DEFAULT_BASE_URL};
pub use openai::OpenAiProvider;
