use crate::core::LLMError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LLMError>> + Send + 'static>>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub struct HttpResponse {
    pub status: u16,
    /// `None` when the transport could not provide a readable body
    pub body: Option<ByteStream>,
}

impl HttpResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// The network capability used by [`crate::providers::LLMClient`].
///
/// `post` resolves once response headers are available; the body is read
/// lazily through [`HttpResponse::body`]. Dropping the returned future aborts
/// the call, and dropping the body stream releases the connection.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(LLMError::from)?;

        let status = response.status().as_u16();
        let body = response.bytes_stream().map_err(LLMError::from).boxed();

        Ok(HttpResponse {
            status,
            body: Some(body),
        })
    }
}

/// Reads at most `limit` bytes of `body` as text, dropping the rest.
pub async fn read_bounded(mut body: ByteStream, limit: usize) -> Result<String, LLMError> {
    let mut buffer = Vec::with_capacity(limit.min(8 * 1024));
    while let Some(bytes) = body.next().await {
        let bytes = bytes?;
        let room = limit - buffer.len();
        buffer.extend_from_slice(&bytes[..bytes.len().min(room)]);
        if buffer.len() >= limit {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
