//! Completion provider adapters.
//!
//! The orchestrator talks to [`CompletionProvider`]; the one concrete
//! adapter speaks the OpenAI chat-completions wire format, which also
//! covers Azure-style gateways, Ollama, vLLM, and similar endpoints.

pub mod openai_compat;
pub mod traits;

pub use openai_compat::OpenAiCompatProvider;
pub use traits::{ChatRequest, ChatResponse, CompletionProvider, Usage};
