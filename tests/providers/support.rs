#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use llm_stream::providers::{ByteStream, HttpRequest, HttpResponse, HttpTransport};
use llm_stream::telemetry::{LogStore, MemoryLogStore, RequestLogger, LoggerConfig};
use llm_stream::{LLMConfig, LLMError};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

pub const API_KEY: &str = "sk-test-1234567890abcdef";

pub fn config() -> LLMConfig {
    LLMConfig::new(API_KEY)
}

pub fn memory_logger() -> (Arc<MemoryLogStore>, Arc<RequestLogger>) {
    let store = Arc::new(MemoryLogStore::new());
    let logger = Arc::new(RequestLogger::new(store.clone(), LoggerConfig::default()));
    (store, logger)
}

pub fn openai_sse(pieces: &[&str]) -> String {
    let mut body = String::new();
    for piece in pieces {
        let line = serde_json::json!({"choices": [{"delta": {"content": piece}, "finish_reason": null}]});
        body.push_str(&format!("data: {line}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Sets a flag when dropped.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct TrackedBody {
    inner: ByteStream,
    _flag: DropFlag,
}

impl Stream for TrackedBody {
    type Item = Result<Bytes, LLMError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Replays a canned response and records what it was asked to send.
#[derive(Default)]
pub struct ScriptedTransport {
    status: u16,
    pieces: Option<Vec<Bytes>>,
    fail_after_body: bool,
    hold_open: bool,
    pub calls: AtomicUsize,
    pub body_dropped: Arc<AtomicBool>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(status: u16, pieces: &[&str]) -> Self {
        Self {
            status,
            pieces: Some(pieces.iter().map(|p| Bytes::from(p.to_string())).collect()),
            ..Self::default()
        }
    }

    pub fn without_body(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// The body never ends after the scripted pieces.
    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// The connection resets after the scripted pieces.
    pub fn failing(mut self) -> Self {
        self.fail_after_body = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn body_was_dropped(&self) -> bool {
        self.body_dropped.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request);

        let body = self.pieces.as_ref().map(|pieces| {
            let mut items: Vec<Result<Bytes, LLMError>> = pieces.iter().cloned().map(Ok).collect();
            if self.fail_after_body {
                items.push(Err(LLMError::transport(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))));
            }
            let scripted = stream::iter(items);
            let inner: ByteStream = if self.hold_open {
                scripted.chain(stream::pending()).boxed()
            } else {
                scripted.boxed()
            };
            TrackedBody {
                inner,
                _flag: DropFlag(self.body_dropped.clone()),
            }
            .boxed()
        });

        Ok(HttpResponse {
            status: self.status,
            body,
        })
    }
}

/// Never produces response headers.
#[derive(Default)]
pub struct HangingTransport {
    pub calls: AtomicUsize,
    pub dropped: Arc<AtomicBool>,
}

impl HangingTransport {
    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for HangingTransport {
    async fn post(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending::<Result<HttpResponse, LLMError>>().await
    }
}

/// Store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl LogStore for BrokenStore {
    async fn append_line(&self, _line: &str) -> Result<(), LLMError> {
        Err(LLMError::IOError("read-only file system".into()))
    }

    async fn read_all(&self) -> Result<Vec<String>, LLMError> {
        Err(LLMError::IOError("read-only file system".into()))
    }

    async fn rewrite(&self, _lines: &[String]) -> Result<(), LLMError> {
        Err(LLMError::IOError("read-only file system".into()))
    }
}
