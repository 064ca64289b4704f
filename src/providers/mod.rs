pub mod anthropic;
pub mod client;
pub mod decoder;
pub mod endpoint;
pub mod openai;
pub mod transport;
pub mod types;

pub use client::{collect_chunks, ChunkStream, LLMClient, DEFAULT_MODEL};
pub use decoder::{decode_stream, Extracted, SseDecoder};
pub use endpoint::{
    browser_headers, build_anthropic_endpoint, build_openai_endpoint, detect_dialect,
    normalize_base_url, Dialect, OPENAI_DEFAULT_ENDPOINT,
};
pub use transport::{ByteStream, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    ChatMessage, ChatParams, CollectMode, Role, StreamChunk, StreamCollectResult, StreamCollector,
    DEFAULT_TIMEOUT_SECS,
};
