use crate::support::{config, openai_sse, BrokenStore, ScriptedTransport, API_KEY};
use llm_stream::providers::{ChatMessage, ChatParams, CollectMode, LLMClient};
use llm_stream::telemetry::{FileLogStore, LoggerConfig, RequestLogger, RequestStatus, LOG_FILE_NAME};
use serde_json::Value;
use std::sync::Arc;

fn file_logger(dir: &std::path::Path, max_entries: usize) -> Arc<RequestLogger> {
    Arc::new(RequestLogger::new(
        Arc::new(FileLogStore::in_dir(dir)),
        LoggerConfig {
            max_entries,
            ..LoggerConfig::default()
        },
    ))
}

#[tokio::test]
async fn test_file_records_are_redacted() {
    let dir = tempfile::tempdir().expect("temp dir");
    let logger = file_logger(dir.path(), 1000);
    let transport = Arc::new(ScriptedTransport::new(200, &[openai_sse(&["fine"]).as_str()]));
    let client = LLMClient::with_transport(config(), transport)
        .expect("valid config")
        .with_logger(logger.clone());

    let long_prompt = "p".repeat(5000);
    let params = ChatParams::new(vec![
        ChatMessage::system("You are terse."),
        ChatMessage::user(long_prompt),
    ])
    .with_top_p(0.5);
    client
        .stream_and_collect(params, CollectMode::ContentOnly)
        .await
        .expect("request succeeds");

    let raw = std::fs::read_to_string(dir.path().join(LOG_FILE_NAME)).expect("log file written");
    assert!(!raw.contains(API_KEY));
    assert_eq!(raw.lines().count(), 1);

    let record: Value = serde_json::from_str(raw.trim_end()).expect("json record");
    assert_eq!(record["apiKeyMasked"], "sk-t...cdef");
    assert_eq!(record["apiFormat"], "openai");
    assert_eq!(record["endpoint"], "https://api.openai.com/v1/chat/completions");
    assert_eq!(record["messagesCount"], 2);
    assert_eq!(record["extraParams"]["top_p"], 0.5);
    let preview = record["messagesPreview"][1]["contentPreview"]
        .as_str()
        .expect("preview string");
    assert!(preview.contains("...(5000chars)..."));
    assert!(preview.chars().count() < 300);
    assert!(record["durationMs"].is_u64());

    let entries = logger.recent_logs(10).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, RequestStatus::Success);
}

#[tokio::test]
async fn test_file_log_is_pruned() {
    let dir = tempfile::tempdir().expect("temp dir");
    let logger = file_logger(&dir.path().join("logs"), 2);

    for word in ["one", "two", "three"] {
        let transport = Arc::new(ScriptedTransport::new(200, &[openai_sse(&[word]).as_str()]));
        let client = LLMClient::with_transport(config(), transport)
            .expect("valid config")
            .with_logger(logger.clone());
        client
            .stream_and_collect(
                ChatParams::new(vec![ChatMessage::user(word)]),
                CollectMode::ContentOnly,
            )
            .await
            .expect("request succeeds");
    }

    let previews: Vec<String> = logger
        .recent_logs(10)
        .await
        .into_iter()
        .filter_map(|entry| entry.response_preview)
        .collect();
    assert_eq!(previews, vec!["two".to_string(), "three".to_string()]);
}

#[tokio::test]
async fn test_broken_store_does_not_fail_request() {
    let logger = Arc::new(RequestLogger::new(Arc::new(BrokenStore), LoggerConfig::default()));
    let transport = Arc::new(ScriptedTransport::new(200, &[openai_sse(&["still", " works"]).as_str()]));
    let client = LLMClient::with_transport(config(), transport)
        .expect("valid config")
        .with_logger(logger.clone());

    let result = client
        .stream_and_collect(
            ChatParams::new(vec![ChatMessage::user("hi")]),
            CollectMode::ContentOnly,
        )
        .await
        .expect("telemetry failures are not request failures");
    assert_eq!(result.content, "still works");
    assert_eq!(logger.pending_count(), 0);
}
