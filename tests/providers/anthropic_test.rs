use crate::support::{config, memory_logger, ScriptedTransport, API_KEY};
use llm_stream::providers::{ChatMessage, ChatParams, CollectMode, LLMClient};
use llm_stream::LLMError;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_STREAM: &str = concat!(
    "event: message_start\n",
    "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_01\",\"role\":\"assistant\"}}\n\n",
    "event: content_block_start\n",
    "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"thinking\",\"thinking\":\"\"}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"Greeting.\"}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
    "event: ping\n",
    "data: {\"type\":\"ping\"}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\n",
    "event: message_delta\n",
    "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":4}}\n\n",
    "event: message_stop\n",
    "data: {\"type\":\"message_stop\"}\n\n",
);

fn conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("Be brief."),
        ChatMessage::user("Hi"),
        ChatMessage::system("Answer in English."),
    ]
}

#[tokio::test]
async fn test_anthropic_request_and_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", API_KEY))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-7-sonnet",
            "system": "Be brief.\n\nAnswer in English.",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 4096,
            "stream": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(MESSAGES_STREAM),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = LLMClient::new(config().with_base_url(server.uri()).with_model("claude-3-7-sonnet"))
        .expect("valid config");
    let result = client
        .stream_and_collect(ChatParams::new(conversation()), CollectMode::WithReasoning)
        .await
        .expect("request succeeds");

    assert_eq!(result.content, "Hello there");
    assert_eq!(result.reasoning, "Greeting.");
    assert_eq!(result.finish_reason.as_deref(), Some("end_turn"));
    assert_eq!(result.chunk_count, 4);
}

#[tokio::test]
async fn test_anthropic_endpoint_variants() {
    for base in ["https://relay.example.com", "https://relay.example.com/v1/", "https://relay.example.com/v1/messages"] {
        let transport = Arc::new(ScriptedTransport::new(200, &["data: {\"type\":\"message_stop\"}\n"]));
        let client = LLMClient::with_transport(config().with_base_url(base), transport.clone())
            .expect("valid config");
        client
            .stream_and_collect(
                ChatParams::new(conversation()).with_model("Claude-3-Haiku"),
                CollectMode::ContentOnly,
            )
            .await
            .expect("request succeeds");

        let request = transport.last_request().expect("request sent");
        assert_eq!(request.url, "https://relay.example.com/v1/messages", "base {base}");
        assert_eq!(request.headers["authorization"], format!("Bearer {API_KEY}").as_str());
    }
}

#[tokio::test]
async fn test_anthropic_without_base_url_is_config_error() {
    let transport = Arc::new(ScriptedTransport::new(200, &[]));
    let (store, logger) = memory_logger();
    let client = LLMClient::with_transport(config(), transport.clone())
        .expect("valid config")
        .with_logger(logger.clone());

    let err = client
        .stream_chat(ChatParams::new(conversation()).with_model("claude-3-opus"))
        .await
        .expect_err("no base url");

    assert!(matches!(err, LLMError::ConfigError(_)));
    assert_eq!(transport.call_count(), 0);
    assert!(store.lines().is_empty());
    assert_eq!(logger.pending_count(), 0);
}
