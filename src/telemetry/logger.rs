use super::redact::{mask_api_key, truncate_content};
use super::store::LogStore;
use crate::core::LLMError;
use crate::providers::{ChatMessage, Dialect, Role};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

const PREVIEWED_MESSAGES: usize = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Records kept on disk before the oldest are pruned
    pub max_entries: usize,
    /// Truncation limit for message previews
    pub preview_chars: usize,
    pub response_preview_chars: usize,
    pub error_chars: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            preview_chars: 200,
            response_preview_chars: 300,
            error_chars: 500,
        }
    }
}

/// Correlates the lifecycle calls of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePreview {
    pub role: Role,
    pub content_preview: String,
}

/// One JSON-lines telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub api_format: Dialect,
    pub endpoint: String,
    pub base_url: String,
    pub api_key_masked: String,
    pub model: String,
    pub messages_count: usize,
    pub messages_preview: Vec<MessagePreview>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: u64,
    pub extra_params: Option<Value>,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// What the client knows about a request before it is sent.
#[derive(Debug, Clone)]
pub struct RequestInfo<'a> {
    pub dialect: Dialect,
    pub endpoint: &'a str,
    pub base_url: &'a str,
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    pub api_key: &'a str,
    pub extra_params: Option<Value>,
}

struct PendingEntry {
    entry: LogEntry,
    started: Instant,
}

/// Records request/success/error events. Failures to persist are reported
/// with `warn!` and never returned to the caller.
pub struct RequestLogger {
    store: Option<Arc<dyn LogStore>>,
    config: LoggerConfig,
    pending: Mutex<HashMap<RequestId, PendingEntry>>,
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("persistent", &self.store.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::console()
    }
}

impl RequestLogger {
    pub fn new(store: Arc<dyn LogStore>, config: LoggerConfig) -> Self {
        Self {
            store: Some(store),
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Logger without persistence; records are emitted through `debug!`.
    pub fn console() -> Self {
        Self {
            store: None,
            config: LoggerConfig::default(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub const fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Opens a pending record and returns its correlation handle.
    pub fn log_request(&self, info: RequestInfo<'_>) -> RequestId {
        let request_id = RequestId::generate();
        let preview_chars = self.config.preview_chars;

        let entry = LogEntry {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            api_format: info.dialect,
            endpoint: info.endpoint.to_string(),
            base_url: info.base_url.to_string(),
            api_key_masked: mask_api_key(info.api_key),
            model: info.model.to_string(),
            messages_count: info.messages.len(),
            messages_preview: info
                .messages
                .iter()
                .take(PREVIEWED_MESSAGES)
                .map(|message| MessagePreview {
                    role: message.role,
                    content_preview: truncate_content(&message.content, preview_chars)
                        .into_owned(),
                })
                .collect(),
            temperature: info.temperature,
            max_tokens: info.max_tokens,
            timeout: info.timeout_secs,
            extra_params: info.extra_params,
            status: RequestStatus::Pending,
            duration_ms: None,
            response_length: None,
            chunk_count: None,
            response_preview: None,
            error_type: None,
            error_message: None,
            status_code: None,
        };

        match self.pending.lock() {
            Ok(mut pending) => {
                pending.insert(
                    request_id.clone(),
                    PendingEntry {
                        entry,
                        started: Instant::now(),
                    },
                );
            }
            Err(_) => warn!("[telemetry] pending table poisoned; request {request_id} not logged"),
        }

        request_id
    }

    pub async fn log_success(
        &self,
        request_id: &RequestId,
        response_length: usize,
        chunk_count: usize,
        response_preview: &str,
    ) {
        let Some(mut entry) = self.settle(request_id, RequestStatus::Success) else {
            return;
        };
        entry.response_length = Some(response_length);
        entry.chunk_count = Some(chunk_count);
        entry.response_preview = Some(
            truncate_content(response_preview, self.config.response_preview_chars).into_owned(),
        );
        self.write_entry(&entry).await;
    }

    pub async fn log_error(&self, request_id: &RequestId, error: &LLMError) {
        let Some(mut entry) = self.settle(request_id, RequestStatus::Error) else {
            return;
        };
        entry.error_type = Some(error.kind().to_string());
        entry.error_message =
            Some(truncate_content(&error.to_string(), self.config.error_chars).into_owned());
        entry.status_code = error.status();
        self.write_entry(&entry).await;
    }

    /// Drops a pending record without writing it, e.g. when the caller
    /// abandons the stream. Returns whether a record was pending.
    pub fn discard(&self, request_id: &RequestId) -> bool {
        self.pending
            .lock()
            .map(|mut pending| pending.remove(request_id).is_some())
            .unwrap_or(false)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// The newest `count` persisted records, oldest first. Unreadable lines
    /// are skipped.
    pub async fn recent_logs(&self, count: usize) -> Vec<LogEntry> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        let lines = match store.read_all().await {
            Ok(lines) => lines,
            Err(e) => {
                warn!("[telemetry] failed to read request log: {e}");
                return Vec::new();
            }
        };
        let skip = lines.len().saturating_sub(count);
        lines
            .iter()
            .skip(skip)
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    fn settle(&self, request_id: &RequestId, status: RequestStatus) -> Option<LogEntry> {
        let pending = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(request_id));

        let Some(PendingEntry { mut entry, started }) = pending else {
            debug!("[telemetry] no pending record for request {request_id}");
            return None;
        };
        entry.status = status;
        entry.duration_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        Some(entry)
    }

    async fn write_entry(&self, entry: &LogEntry) {
        if let Err(e) = self.try_write_entry(entry).await {
            warn!(
                "[telemetry] failed to write request log for {}: {e}",
                entry.request_id
            );
        }
    }

    async fn try_write_entry(&self, entry: &LogEntry) -> Result<(), LLMError> {
        let line = serde_json::to_string(entry)
            .map_err(|e| LLMError::IOError(format!("failed to serialize log entry: {e}")))?;

        let Some(store) = &self.store else {
            debug!("[llm-log] {line}");
            return Ok(());
        };

        store.append_line(&line).await?;
        self.prune(store.as_ref()).await
    }

    async fn prune(&self, store: &dyn LogStore) -> Result<(), LLMError> {
        let lines = store.read_all().await?;
        if lines.len() > self.config.max_entries {
            let keep_from = lines.len() - self.config.max_entries;
            store.rewrite(&lines[keep_from..]).await?;
            debug!("[telemetry] pruned {keep_from} old request records");
        }
        Ok(())
    }
}
