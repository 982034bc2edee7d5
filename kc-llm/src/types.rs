use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed parameters for minimal-mode probes. Cheap enough to exercise
/// authentication without paying for a real request.
pub(crate) const MINIMAL_PROMPT: &str = "Hi";
pub(crate) const MINIMAL_MAX_TOKENS: u32 = 5;
pub(crate) const MINIMAL_TEMPERATURE: f32 = 0.1;

/// Reported instead of the throwaway model output when probing minimally.
pub(crate) const MINIMAL_CONFIRMATION: &str = "API key is valid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Minimal,
    Full,
}

impl TestType {
    pub(crate) fn from_minimal(minimal: bool) -> Self {
        if minimal { Self::Minimal } else { Self::Full }
    }
}

/// Normalized outcome of a provider probe.
///
/// Exactly one of the two shapes is populated, and serialization always
/// carries a `success` flag so the report can be relayed verbatim as a JSON
/// API response.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeReport {
    Success {
        response: String,
        tokens_used: u32,
        model_used: String,
        test_type: TestType,
    },
    Failure {
        error: String,
    },
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl Serialize for ProbeReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Success {
                response,
                tokens_used,
                model_used,
                test_type,
            } => {
                let mut s = serializer.serialize_struct("ProbeReport", 5)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("response", response)?;
                s.serialize_field("tokens_used", tokens_used)?;
                s.serialize_field("model_used", model_used)?;
                s.serialize_field("test_type", test_type)?;
                s.end()
            }
            Self::Failure { error } => {
                let mut s = serializer.serialize_struct("ProbeReport", 2)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("error", error)?;
                s.end()
            }
        }
    }
}

/// Caller parameters after applying the minimal-mode override.
pub(crate) struct EffectiveParams<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl<'a> EffectiveParams<'a> {
    pub fn resolve(prompt: &'a str, temperature: f32, max_tokens: u32, minimal: bool) -> Self {
        if minimal {
            Self {
                prompt: MINIMAL_PROMPT,
                temperature: MINIMAL_TEMPERATURE,
                max_tokens: MINIMAL_MAX_TOKENS,
            }
        } else {
            Self {
                prompt,
                temperature,
                max_tokens,
            }
        }
    }
}
