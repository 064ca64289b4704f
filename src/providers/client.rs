use crate::core::{LLMConfig, LLMError};
use crate::providers::endpoint::{
    browser_headers, build_anthropic_endpoint, build_openai_endpoint, detect_dialect, Dialect,
};
use crate::providers::transport::{
    read_bounded, ByteStream, HttpRequest, HttpTransport, ReqwestTransport,
};
use crate::providers::{anthropic, decode_stream, openai};
use crate::providers::{ChatParams, CollectMode, StreamChunk, StreamCollectResult, StreamCollector};
use crate::telemetry::{RequestId, RequestInfo, RequestLogger};
use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};
use log::{debug, trace, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
const ERROR_BODY_LIMIT: usize = 64 * 1024;
const ERROR_EXCERPT_CHARS: usize = 500;
const TRACED_CHUNKS: usize = 3;
/// Deadline used when the requested timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Streaming chat client speaking both the OpenAI and Anthropic dialects.
///
/// The dialect is chosen per request from the model name. Every request is
/// recorded through the attached [`RequestLogger`].
#[derive(Clone)]
pub struct LLMClient {
    api_key: SecretString,
    base_url: Option<String>,
    default_model: Option<String>,
    simulate_browser: bool,
    transport: Arc<dyn HttpTransport>,
    logger: Arc<RequestLogger>,
}

impl LLMClient {
    pub fn new(config: LLMConfig) -> Result<Self, LLMError> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(
        config: LLMConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, LLMError> {
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(LLMError::ConfigError("API key must not be empty".to_string()));
        }

        Ok(Self {
            api_key: config.api_key,
            base_url: config.base_url.filter(|url| !url.trim().is_empty()),
            default_model: config.model.filter(|model| !model.trim().is_empty()),
            simulate_browser: false,
            transport,
            logger: Arc::new(RequestLogger::console()),
        })
    }

    /// Client as built from user settings.
    pub fn from_config(config: LLMConfig, simulate_browser: bool) -> Result<Self, LLMError> {
        Ok(Self::new(config)?.with_simulate_browser(simulate_browser))
    }

    pub fn with_logger(mut self, logger: Arc<RequestLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub const fn with_simulate_browser(mut self, simulate_browser: bool) -> Self {
        self.simulate_browser = simulate_browser;
        self
    }

    pub fn logger(&self) -> &Arc<RequestLogger> {
        &self.logger
    }

    fn resolve_model<'a>(&'a self, params: &'a ChatParams) -> &'a str {
        params
            .model
            .as_deref()
            .filter(|model| !model.is_empty())
            .or(self.default_model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }

    fn endpoint(&self, dialect: Dialect) -> Result<String, LLMError> {
        match dialect {
            Dialect::OpenAi => Ok(build_openai_endpoint(self.base_url.as_deref())),
            Dialect::Anthropic => self
                .base_url
                .as_deref()
                .map(build_anthropic_endpoint)
                .ok_or_else(|| {
                    LLMError::ConfigError(
                        "A base URL is required for Anthropic-format models".to_string(),
                    )
                }),
        }
    }

    fn build_headers(&self, dialect: Dialect) -> Result<HeaderMap, LLMError> {
        let mut headers = if self.simulate_browser {
            browser_headers()
        } else {
            HeaderMap::new()
        };

        let key = self.api_key.expose_secret();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, sensitive_header(&format!("Bearer {key}"))?);

        if dialect == Dialect::Anthropic {
            headers.insert("x-api-key", sensitive_header(key)?);
            headers.insert(
                "anthropic-version",
                HeaderValue::from_static(anthropic::API_VERSION),
            );
        }

        Ok(headers)
    }

    /// Sends the request and returns the decoded chunk stream.
    ///
    /// Fails before any chunk is produced on configuration problems, a
    /// non-success status, an empty body, timeout or cancellation.
    pub async fn stream_chat(&self, params: ChatParams) -> Result<ChunkStream, LLMError> {
        let model = self.resolve_model(&params);
        let dialect = detect_dialect(model);
        let endpoint = self.endpoint(dialect)?;
        let headers = self.build_headers(dialect)?;
        let body = encode_payload(dialect, model, &params)?;
        let timeout_secs = params.timeout_secs();

        let request_id = self.logger.log_request(RequestInfo {
            dialect,
            endpoint: &endpoint,
            base_url: self.base_url.as_deref().unwrap_or(OPENAI_DEFAULT_BASE_URL),
            model,
            messages: &params.messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            timeout_secs,
            api_key: self.api_key.expose_secret(),
            extra_params: extra_params(&params),
        });
        debug!("[llm] {dialect} request {request_id} to {endpoint} with model {model}");
        let guard = PendingGuard {
            logger: Arc::clone(&self.logger),
            request_id,
        };

        let request = HttpRequest {
            url: endpoint,
            headers,
            body,
        };

        let exchanged = self
            .exchange(request, timeout_secs, params.cancel.as_ref())
            .await;
        match exchanged {
            Ok(stream) => Ok(chunk_stream(guard, stream, dialect, params.cancel)),
            Err(e) => {
                warn!("[llm] request {} failed: {e}", guard.request_id);
                self.logger.log_error(&guard.request_id, &e).await;
                Err(e)
            }
        }
    }

    /// Drives a request to completion and accumulates its chunks.
    pub async fn stream_and_collect(
        &self,
        params: ChatParams,
        mode: CollectMode,
    ) -> Result<StreamCollectResult, LLMError> {
        let stream = self.stream_chat(params).await?;
        collect_chunks(stream, mode).await
    }

    /// POSTs the request and checks the status. The deadline covers the
    /// header wait and, on failure, reading the error body.
    async fn exchange(
        &self,
        request: HttpRequest,
        seconds: u64,
        cancel: Option<&CancellationToken>,
    ) -> Result<ByteStream, LLMError> {
        let now = Instant::now();
        let deadline = now
            .checked_add(Duration::from_secs(seconds))
            .unwrap_or(now + FAR_FUTURE);

        let response = until_cancelled(cancel, timeout_at(deadline, self.transport.post(request)))
            .await?
            .map_err(|_| LLMError::Timeout { seconds })??;

        if !response.is_success() {
            let body = match response.body {
                Some(body) => {
                    let read = timeout_at(deadline, read_bounded(body, ERROR_BODY_LIMIT));
                    match until_cancelled(cancel, read).await? {
                        Ok(Ok(text)) => text,
                        Ok(Err(e)) => {
                            debug!("[llm] failed to read error body: {e}");
                            String::new()
                        }
                        Err(_) => {
                            debug!("[llm] timed out reading error body");
                            String::new()
                        }
                    }
                }
                None => String::new(),
            };
            return Err(LLMError::Http {
                status: response.status,
                body: body.chars().take(ERROR_EXCERPT_CHARS).collect(),
            });
        }

        response
            .body
            .ok_or_else(|| LLMError::Protocol("empty response body".to_string()))
    }
}

/// Wraps a response body in the telemetry-reporting chunk stream. `guard`
/// owns the pending record from the moment the request was logged.
fn chunk_stream(
    guard: PendingGuard,
    body: ByteStream,
    dialect: Dialect,
    cancel: Option<CancellationToken>,
) -> ChunkStream {
    let request_id = guard.request_id.clone();
    let inner = stream! {
        let guard = guard;
        let mut chunks = Box::pin(decode_stream(body, dialect));
        let mut content = String::new();
        let mut content_chunks = 0usize;

        let outcome = loop {
            match next_or_cancelled(&mut chunks, cancel.as_ref()).await {
                Some(Ok(chunk)) => {
                    if let Some(text) = chunk.content.as_deref().filter(|t| !t.is_empty()) {
                        content.push_str(text);
                        content_chunks += 1;
                    }
                    yield Ok(chunk);
                }
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            }
        };
        drop(chunks);

        match outcome {
            Ok(()) => {
                debug!(
                    "[llm] request {} completed: {content_chunks} content chunks",
                    guard.request_id
                );
                guard
                    .logger
                    .log_success(&guard.request_id, content.chars().count(), content_chunks, &content)
                    .await;
            }
            Err(e) => {
                warn!("[llm] stream {} failed: {e}", guard.request_id);
                guard.logger.log_error(&guard.request_id, &e).await;
                yield Err(e);
            }
        }
    };

    ChunkStream {
        inner: Box::pin(inner),
        request_id,
    }
}

/// Accumulates any chunk stream according to `mode`.
pub async fn collect_chunks<S>(stream: S, mode: CollectMode) -> Result<StreamCollectResult, LLMError>
where
    S: Stream<Item = Result<StreamChunk, LLMError>>,
{
    pin_mut!(stream);
    let mut collector = StreamCollector::new(mode);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if collector.chunk_count() < TRACED_CHUNKS {
            trace!("[llm] chunk #{}: {chunk:?}", collector.chunk_count() + 1);
        }
        collector.push(&chunk);
    }

    Ok(collector.finish())
}

/// Lazily decoded response chunks of one request.
///
/// Dropping the stream before it ends releases the underlying connection and
/// discards the request's pending telemetry record.
pub struct ChunkStream {
    inner: Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>,
    request_id: RequestId,
}

impl ChunkStream {
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Stops reading; equivalent to dropping the stream.
    pub fn close(self) {
        drop(self);
    }
}

impl Stream for ChunkStream {
    type Item = Result<StreamChunk, LLMError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Discards the pending telemetry record if the request is dropped before
/// it is settled, whether during the header wait or mid-stream.
struct PendingGuard {
    logger: Arc<RequestLogger>,
    request_id: RequestId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.logger.discard(&self.request_id) {
            debug!("[llm] stream {} closed before completion", self.request_id);
        }
    }
}

async fn until_cancelled<F: std::future::Future>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Result<F::Output, LLMError> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(LLMError::Cancelled),
            output = fut => Ok(output),
        },
        None => Ok(fut.await),
    }
}

async fn next_or_cancelled<S, T>(
    stream: &mut S,
    cancel: Option<&CancellationToken>,
) -> Option<Result<T, LLMError>>
where
    S: Stream<Item = Result<T, LLMError>> + Unpin,
{
    match until_cancelled(cancel, stream.next()).await {
        Ok(item) => item,
        Err(e) => Some(Err(e)),
    }
}

fn sensitive_header(value: &str) -> Result<HeaderValue, LLMError> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        LLMError::ConfigError("API key contains characters not allowed in a header".to_string())
    })?;
    header.set_sensitive(true);
    Ok(header)
}

fn encode_payload(dialect: Dialect, model: &str, params: &ChatParams) -> Result<Vec<u8>, LLMError> {
    let encoded = match dialect {
        Dialect::OpenAi => serde_json::to_vec(&openai::build_request(model, params)),
        Dialect::Anthropic => serde_json::to_vec(&anthropic::build_request(model, params)),
    };
    encoded.map_err(|e| LLMError::ConfigError(format!("Failed to encode request: {e}")))
}

fn extra_params(params: &ChatParams) -> Option<Value> {
    let mut extra = Map::new();
    if let Some(top_p) = params.top_p {
        extra.insert("top_p".to_string(), json!(top_p));
    }
    if let Some(format) = &params.response_format {
        extra.insert("response_format".to_string(), json!(format));
    }
    (!extra.is_empty()).then_some(Value::Object(extra))
}
