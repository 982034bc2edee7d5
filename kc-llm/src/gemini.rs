use crate::error::{CompletionError, ProbeError, vendor_message};
use crate::types::{
    COMPLETION_TIMEOUT, EffectiveParams, MINIMAL_CONFIRMATION, PROBE_TIMEOUT, ProbeReport,
    TestType,
};
use serde::{Deserialize, Serialize};

const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER: &str = "Gemini";

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, GEMINI_API_BASE_URL)
    }

    /// Point the client at a non-default API base (mock servers).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Check that the credential/model pair is usable. Never fails outward:
    /// every outcome, including transport errors, lands in the report.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn probe(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        minimal: bool,
    ) -> ProbeReport {
        match self
            .try_probe(model, prompt, temperature, max_tokens, minimal)
            .await
        {
            Ok(report) => report,
            Err(e) => ProbeReport::Failure {
                error: e.to_string(),
            },
        }
    }

    async fn try_probe(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        minimal: bool,
    ) -> Result<ProbeReport, ProbeError> {
        let params = EffectiveParams::resolve(prompt, temperature, max_tokens, minimal);
        let req = GeminiGenerateRequest::new(params.prompt, params.temperature, params.max_tokens);

        let response = self
            .http
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.api_key)
            .timeout(PROBE_TIMEOUT)
            .json(&req)
            .send()
            .await
            .map_err(|e| classify_error(&e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(&e.to_string()))?;
        if !status.is_success() {
            return Err(classify_error(&vendor_message(&body)));
        }

        let parsed: GeminiGenerateResponse =
            serde_json::from_str(&body).map_err(|e| classify_error(&e.to_string()))?;
        let text = extract_text(&parsed);

        // Exact counts only when the response reports them; otherwise a
        // whitespace word-count approximation over prompt and response.
        let tokens_used = match parsed.usage_metadata.as_ref() {
            Some(u) if u.total_token_count > 0 => u.total_token_count,
            _ => estimate_tokens(params.prompt, &text),
        };

        Ok(ProbeReport::Success {
            response: if minimal {
                MINIMAL_CONFIRMATION.to_string()
            } else {
                text
            },
            tokens_used,
            model_used: parsed
                .model_version
                .clone()
                .unwrap_or_else(|| model.to_string()),
            test_type: TestType::from_minimal(minimal),
        })
    }

    /// Single generation call with caller parameters verbatim. No error
    /// translation; the response comes back in the vendor's own shape.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<GeminiGenerateResponse, CompletionError> {
        let req = GeminiGenerateRequest::new(prompt, temperature, max_tokens);

        let response = self
            .http
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Http(format!(
                "gemini generate status={status} body={body}"
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// All text parts of the first candidate, joined; a candidate with no text
/// part is reported as its JSON rendering rather than dropped.
fn extract_text(response: &GeminiGenerateResponse) -> String {
    let Some(candidate) = response.candidates.first() else {
        return String::new();
    };
    let parts = candidate
        .content
        .as_ref()
        .map(|c| c.parts.as_slice())
        .unwrap_or(&[]);
    let text: Vec<&str> = parts.iter().filter_map(|p| p.text.as_deref()).collect();
    if text.is_empty() {
        serde_json::to_string(candidate).unwrap_or_default()
    } else {
        text.concat()
    }
}

/// This endpoint does not always report usage; approximate with
/// whitespace-delimited word counts, not a real tokenizer.
fn estimate_tokens(prompt: &str, response: &str) -> u32 {
    (prompt.split_whitespace().count() + response.split_whitespace().count()) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    InvalidKey,
    Quota,
    Permission,
    ModelNotFound,
}

/// The vendor reports errors as free text rather than a typed hierarchy, so
/// classification is an ordered table of (required phrases, category) rows.
/// A row matches when every phrase appears (case-insensitive); the first
/// matching row wins, anything else is a generic vendor error.
const ERROR_PATTERNS: &[(&[&str], ErrorCategory)] = &[
    (&["api_key_invalid"], ErrorCategory::InvalidKey),
    (&["api key not valid"], ErrorCategory::InvalidKey),
    (&["invalid api key"], ErrorCategory::InvalidKey),
    (&["quota"], ErrorCategory::Quota),
    (&["limit"], ErrorCategory::Quota),
    (&["permission"], ErrorCategory::Permission),
    (&["access"], ErrorCategory::Permission),
    (&["model", "not found"], ErrorCategory::ModelNotFound),
];

fn classify_error(message: &str) -> ProbeError {
    let lowered = message.to_lowercase();
    for (phrases, category) in ERROR_PATTERNS {
        if phrases.iter().all(|phrase| lowered.contains(phrase)) {
            return match category {
                ErrorCategory::InvalidKey => ProbeError::Auth(message.to_string()),
                ErrorCategory::Quota => ProbeError::RateLimit(message.to_string()),
                ErrorCategory::Permission => ProbeError::Permission(message.to_string()),
                ErrorCategory::ModelNotFound => ProbeError::ModelNotFound(message.to_string()),
            };
        }
    }
    ProbeError::Api {
        provider: PROVIDER,
        message: message.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct GeminiGenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

impl GeminiGenerateRequest {
    fn new(prompt: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerateResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}
