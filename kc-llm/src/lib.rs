//! BYO-key LLM provider adapters for KeyCheck.
//!
//! One adapter per vendor over plain HTTP, no SDK crates. Probes normalize
//! every outcome into a [`ProbeReport`]; completions return the vendor
//! response untouched and let failures propagate.

mod anthropic;
mod error;
mod gemini;
mod openai;
mod types;

pub use anthropic::{
    AnthropicClient, AnthropicContentBlock, AnthropicMessageResponse, AnthropicUsage,
};
pub use error::{CompletionError, ProbeError};
pub use gemini::{
    GeminiCandidate, GeminiClient, GeminiContent, GeminiGenerateResponse, GeminiPart,
    GeminiUsageMetadata,
};
pub use openai::{
    OpenAiChatCompletion, OpenAiChoice, OpenAiChoiceMessage, OpenAiClient, OpenAiUsage,
};
pub use types::{ChatMessage, ProbeReport, Role, TestType};
