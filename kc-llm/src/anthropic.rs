use crate::error::{CompletionError, ProbeError, classify_status};
use crate::types::{
    COMPLETION_TIMEOUT, ChatMessage, EffectiveParams, MINIMAL_CONFIRMATION, PROBE_TIMEOUT,
    ProbeReport, Role, TestType,
};
use serde::{Deserialize, Serialize};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "Anthropic";

#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, ANTHROPIC_MESSAGES_URL)
    }

    /// Point the client at a non-default messages endpoint (mock servers).
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Self {
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
            endpoint: endpoint.to_string(),
        }
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
        let messages = vec![ChatMessage {
            role: Role::User,
            content: params.prompt.to_string(),
        }];
        let req = AnthropicRequest::new(model, &messages, params.temperature, params.max_tokens);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(PROBE_TIMEOUT)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(PROVIDER, status, &body));
        }

        let parsed: AnthropicMessageResponse = serde_json::from_str(&body)?;
        let text = extract_text(&parsed.content);

        Ok(ProbeReport::Success {
            response: if minimal {
                MINIMAL_CONFIRMATION.to_string()
            } else {
                text
            },
            tokens_used: parsed
                .usage
                .as_ref()
                .map(|u| u.input_tokens + u.output_tokens)
                .unwrap_or(0),
            model_used: if parsed.model.is_empty() {
                model.to_string()
            } else {
                parsed.model.clone()
            },
            test_type: TestType::from_minimal(minimal),
        })
    }

    /// Single message turn with caller parameters verbatim. No error
    /// translation; the response comes back in the vendor's own shape.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<AnthropicMessageResponse, CompletionError> {
        let req = AnthropicRequest::new(model, messages, temperature, max_tokens);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Http(format!(
                "anthropic messages status={status} body={body}"
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// First text-bearing block wins; anything else is reported as its JSON
/// rendering rather than dropped.
fn extract_text(content: &[AnthropicContentBlock]) -> String {
    match content.first() {
        Some(block) => match &block.text {
            Some(text) => text.clone(),
            None => serde_json::to_string(block).unwrap_or_default(),
        },
        None => String::new(),
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<AnthropicMessage>,
}

impl AnthropicRequest {
    fn new(model: &str, messages: &[ChatMessage], temperature: f32, max_tokens: u32) -> Self {
        let mut system = String::new();
        let mut out_messages = Vec::new();

        for m in messages {
            match m.role {
                Role::System => {
                    if !system.is_empty() {
                        system.push('\n');
                    }
                    system.push_str(m.content.trim());
                }
                Role::User => out_messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: m.content.clone(),
                }),
                Role::Assistant => out_messages.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: m.content.clone(),
                }),
            }
        }

        Self {
            model: model.to_string(),
            max_tokens,
            temperature,
            system,
            messages: out_messages,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessageResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<AnthropicUsage>,
}

/// Content blocks are heterogeneous; only the `text` capability is read here,
/// the rest rides along untouched for pass-through callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}
