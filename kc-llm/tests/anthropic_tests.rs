use kc_llm::{AnthropicClient, ChatMessage, CompletionError, Role};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, api_key: &str) -> AnthropicClient {
    AnthropicClient::with_endpoint(api_key, &format!("{}/v1/messages", server.uri()))
}

fn message_body(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 9}
    })
}

fn error_body(error_type: &str, message: &str) -> serde_json::Value {
    json!({
        "type": "error",
        "error": {"type": error_type, "message": message}
    })
}

#[tokio::test]
async fn minimal_probe_overrides_caller_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "Hi"}],
            "temperature": 0.1,
            "max_tokens": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let report = client_for(&server, "sk-ant-test")
        .probe("claude-3-5-sonnet-latest", "write a haiku about rust", 1.0, 1024, true)
        .await;

    assert_eq!(
        serde_json::to_value(&report).expect("report serializes"),
        json!({
            "success": true,
            "response": "API key is valid",
            "tokens_used": 19,
            "model_used": "claude-3-5-sonnet-20241022",
            "test_type": "minimal"
        })
    );
}

#[tokio::test]
async fn full_probe_reports_live_output_and_summed_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "say hello"}],
            "max_tokens": 64
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("Hello there")))
        .mount(&server)
        .await;

    let report = client_for(&server, "sk-ant-test")
        .probe("claude-3-5-sonnet-latest", "say hello", 0.5, 64, false)
        .await;

    assert_eq!(
        serde_json::to_value(&report).expect("report serializes"),
        json!({
            "success": true,
            "response": "Hello there",
            "tokens_used": 19,
            "model_used": "claude-3-5-sonnet-20241022",
            "test_type": "full"
        })
    );
}

#[tokio::test]
async fn invalid_credential_is_an_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(error_body("authentication_error", "invalid x-api-key")),
        )
        .mount(&server)
        .await;

    let report = client_for(&server, "sk-ant-invalid")
        .probe("claude-3-5-sonnet-latest", "test", 0.1, 5, true)
        .await;

    assert!(!report.is_success());
    let value = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(value["success"], json!(false));
    let error = value["error"].as_str().expect("error string");
    assert!(error.starts_with("Authentication failed: "), "{error}");
    assert!(error.contains("invalid x-api-key"), "{error}");
}

#[tokio::test]
async fn malformed_request_is_a_bad_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body(
            "invalid_request_error",
            "max_tokens: must be greater than 0",
        )))
        .mount(&server)
        .await;

    let report = client_for(&server, "sk-ant-test")
        .probe("claude-3-5-sonnet-latest", "test", 0.1, 5, false)
        .await;

    let value = serde_json::to_value(&report).expect("report serializes");
    let error = value["error"].as_str().expect("error string");
    assert!(error.starts_with("Bad request: "), "{error}");
}

#[tokio::test]
async fn unknown_model_is_a_not_found_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(404).set_body_json(error_body(
            "not_found_error",
            "model: claude-nope",
        )))
        .mount(&server)
        .await;

    let report = client_for(&server, "sk-ant-test")
        .probe("claude-nope", "test", 0.1, 5, true)
        .await;

    let value = serde_json::to_value(&report).expect("report serializes");
    let error = value["error"].as_str().expect("error string");
    assert!(
        error.starts_with("Model not found or not available: "),
        "{error}"
    );
}

#[tokio::test]
async fn completion_passes_the_vendor_response_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-latest",
            "system": "be brief",
            "messages": [{"role": "user", "content": "hello"}],
            "max_tokens": 50
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("Hello!")))
        .mount(&server)
        .await;

    let messages = vec![
        ChatMessage {
            role: Role::System,
            content: "be brief".to_string(),
        },
        ChatMessage {
            role: Role::User,
            content: "hello".to_string(),
        },
    ];
    let response = client_for(&server, "sk-ant-test")
        .complete("claude-3-5-sonnet-latest", &messages, 0.25, 50)
        .await
        .expect("completion succeeds");

    assert_eq!(response.id, "msg_test");
    assert_eq!(response.model, "claude-3-5-sonnet-20241022");
    assert_eq!(response.content[0].text.as_deref(), Some("Hello!"));
    assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
    let usage = response.usage.expect("usage present");
    assert_eq!((usage.input_tokens, usage.output_tokens), (10, 9));
}

#[tokio::test]
async fn completion_failures_propagate_untranslated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(529).set_body_json(error_body("overloaded_error", "Overloaded")),
        )
        .mount(&server)
        .await;

    let messages = vec![ChatMessage {
        role: Role::User,
        content: "hello".to_string(),
    }];
    let err = client_for(&server, "sk-ant-test")
        .complete("claude-3-5-sonnet-latest", &messages, 0.25, 50)
        .await
        .expect_err("completion fails");

    assert!(matches!(err, CompletionError::Http(_)));
    let rendered = err.to_string();
    assert!(rendered.contains("status=529"), "{rendered}");
    assert!(rendered.contains("Overloaded"), "{rendered}");
}
