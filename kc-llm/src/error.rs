use reqwest::StatusCode;
use thiserror::Error;

/// Bounded failure taxonomy for probe calls.
///
/// A probe never surfaces one of these directly; the adapter converts it into
/// the failure shape of a `ProbeReport`, so the display strings below are the
/// messages an end user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit or quota exceeded: {0}")]
    RateLimit(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Model not found or not available: {0}")]
    ModelNotFound(String),

    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unexpected(e.to_string())
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unexpected(e.to_string())
    }
}

/// Completion calls deliberately skip the probe taxonomy: the caller owns
/// error handling for real traffic, so failures pass through untranslated.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("http error: {0}")]
    Http(String),

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<serde_json::Error> for CompletionError {
    fn from(e: serde_json::Error) -> Self {
        Self::ResponseFormat(e.to_string())
    }
}

/// Map an HTTP error status onto the taxonomy, most specific first.
pub(crate) fn classify_status(provider: &'static str, status: StatusCode, body: &str) -> ProbeError {
    let message = vendor_message(body);
    match status {
        StatusCode::UNAUTHORIZED => ProbeError::Auth(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProbeError::BadRequest(message)
        }
        StatusCode::TOO_MANY_REQUESTS => ProbeError::RateLimit(message),
        StatusCode::FORBIDDEN => ProbeError::Permission(message),
        StatusCode::NOT_FOUND => ProbeError::ModelNotFound(message),
        _ => ProbeError::Api {
            provider,
            message: format!("status={status} {message}"),
        },
    }
}

/// Pull the human-readable message out of a vendor error body, falling back
/// to the raw body when it is not the expected `{"error": {"message": ...}}`.
pub(crate) fn vendor_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let err = classify_status("OpenAI", StatusCode::UNAUTHORIZED, body);
        assert_eq!(
            err.to_string(),
            "Authentication failed: Incorrect API key provided"
        );
    }

    #[test]
    fn status_taxonomy_is_distinct_per_category() {
        let body = r#"{"error": {"message": "boom"}}"#;
        let cases = [
            (StatusCode::BAD_REQUEST, "Bad request: boom"),
            (StatusCode::TOO_MANY_REQUESTS, "Rate limit or quota exceeded: boom"),
            (StatusCode::FORBIDDEN, "Permission denied: boom"),
            (StatusCode::NOT_FOUND, "Model not found or not available: boom"),
        ];
        for (status, expected) in cases {
            assert_eq!(classify_status("OpenAI", status, body).to_string(), expected);
        }
    }

    #[test]
    fn unclassified_status_becomes_vendor_api_error() {
        let err = classify_status(
            "Anthropic",
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": {"message": "overloaded"}}"#,
        );
        assert_eq!(
            err.to_string(),
            "Anthropic API error: status=500 Internal Server Error overloaded"
        );
    }

    #[test]
    fn vendor_message_falls_back_to_raw_body() {
        assert_eq!(vendor_message("plain text failure"), "plain text failure");
        assert_eq!(vendor_message(r#"{"detail": "nope"}"#), r#"{"detail": "nope"}"#);
        assert_eq!(
            vendor_message(r#"{"error": {"message": "invalid x-api-key"}}"#),
            "invalid x-api-key"
        );
    }
}
