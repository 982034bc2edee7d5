use crate::error::{CompletionError, ProbeError, classify_status};
use crate::types::{
    COMPLETION_TIMEOUT, ChatMessage, EffectiveParams, MINIMAL_CONFIRMATION, PROBE_TIMEOUT,
    ProbeReport, Role, TestType,
};
use serde::{Deserialize, Serialize};

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const PROVIDER: &str = "OpenAI";

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, OPENAI_CHAT_COMPLETIONS_URL)
    }

    /// Point the client at a non-default chat completions endpoint
    /// (compatible proxies, mock servers).
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
        let req = OpenAiChatRequest::new(model, &messages, params.temperature, params.max_tokens);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(PROBE_TIMEOUT)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(PROVIDER, status, &body));
        }

        let parsed: OpenAiChatCompletion = serde_json::from_str(&body)?;
        let choice = parsed
            .choices
            .first()
            .ok_or_else(|| ProbeError::Unexpected("openai response missing choices".to_string()))?;
        let text = choice.message.content.clone().unwrap_or_default();

        Ok(ProbeReport::Success {
            response: if minimal {
                MINIMAL_CONFIRMATION.to_string()
            } else {
                text
            },
            tokens_used: parsed.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0),
            model_used: if parsed.model.is_empty() {
                model.to_string()
            } else {
                parsed.model.clone()
            },
            test_type: TestType::from_minimal(minimal),
        })
    }

    /// Single chat completion with caller parameters verbatim. No error
    /// translation; the response comes back in the vendor's own shape.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<OpenAiChatCompletion, CompletionError> {
        let req = OpenAiChatRequest::new(model, messages, temperature, max_tokens);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Http(format!(
                "openai chat status={status} body={body}"
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatRequest {
    fn new(model: &str, messages: &[ChatMessage], temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages: messages.iter().map(to_openai_message).collect(),
            temperature,
            max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

fn to_openai_message(m: &ChatMessage) -> OpenAiMessage {
    let role = match m.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    OpenAiMessage {
        role: role.to_string(),
        content: m.content.clone(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChatCompletion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChoiceMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
